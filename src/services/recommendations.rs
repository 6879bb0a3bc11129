use std::sync::Arc;

use tracing::instrument;

use crate::{
    config::RecommenderConfig,
    db::{CacheInvalidator, CacheKey, CatalogStore, FeedbackStore, InteractionStore, NoopCache},
    error::AppResult,
    models::{
        FeedbackCreate, RecommendationFeedback, RecommendationItem, RecommendationParameters,
        RecommendationStats, RecommendationType, UserId,
    },
    services::{feedback, profile, scoring::RankingStrategy},
};

/// Produces ranked book recommendations for a user
///
/// Every request reads a fresh snapshot through the stores and keeps no
/// state between requests. Scorer faults never reach the caller: they are
/// logged and answered with the fallback list, and the fallback itself
/// degrades to an empty list.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    interactions: Arc<dyn InteractionStore>,
    feedback: Arc<dyn FeedbackStore>,
    cache: Arc<dyn CacheInvalidator>,
    config: RecommenderConfig,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        interactions: Arc<dyn InteractionStore>,
        feedback: Arc<dyn FeedbackStore>,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            catalog,
            interactions,
            feedback,
            cache: Arc::new(NoopCache),
            config,
        }
    }

    /// Replaces the no-op invalidation hook with a real cache's
    pub fn with_cache_invalidator(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = cache;
        self
    }

    /// Runs the requested strategy
    pub async fn recommend(
        &self,
        user_id: UserId,
        recommendation_type: RecommendationType,
        params: &RecommendationParameters,
    ) -> Vec<RecommendationItem> {
        match recommendation_type {
            RecommendationType::ContentBased => self.content_based(user_id, params).await,
            RecommendationType::PopularityBased => self.popularity_based(user_id, params).await,
        }
    }

    /// Content-based and popularity-based lists for the same parameters
    pub async fn recommend_all(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> (Vec<RecommendationItem>, Vec<RecommendationItem>) {
        let content_based = self.content_based(user_id, params).await;
        let popularity_based = self.popularity_based(user_id, params).await;
        (content_based, popularity_based)
    }

    /// Books sharing genres with the user's favorites, blended with quality
    #[instrument(skip(self, params), fields(strategy = "content_based", limit = params.limit))]
    pub async fn content_based(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> Vec<RecommendationItem> {
        let items = match self.try_content_based(user_id, params).await {
            Ok(Some(items)) => items,
            Ok(None) => {
                tracing::info!(user_id, "No favorites to derive affinity from, using fallback");
                self.fallback(user_id, params, RecommendationType::ContentBased).await
            }
            Err(e) => {
                tracing::error!(
                    user_id,
                    strategy = "content_based",
                    error = %e,
                    "Content-based recommendations failed, using fallback"
                );
                self.fallback(user_id, params, RecommendationType::ContentBased).await
            }
        };

        self.record_served(RecommendationType::ContentBased, &items).await;
        items
    }

    /// Books ranked by rating, review volume and favorites
    #[instrument(skip(self, params), fields(strategy = "popularity_based", limit = params.limit))]
    pub async fn popularity_based(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> Vec<RecommendationItem> {
        let items = match self.try_popularity_based(user_id, params).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(
                    user_id,
                    strategy = "popularity_based",
                    error = %e,
                    "Popularity-based recommendations failed, using fallback"
                );
                self.fallback(user_id, params, RecommendationType::PopularityBased).await
            }
        };

        self.record_served(RecommendationType::PopularityBased, &items).await;
        items
    }

    /// `Ok(None)` when the user has no affinity to rank against
    async fn try_content_based(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> AppResult<Option<Vec<RecommendationItem>>> {
        let affinity = profile::extract_affinity(
            self.catalog.as_ref(),
            user_id,
            self.config.max_affinity_genres,
        )
        .await?;

        if affinity.is_empty() {
            return Ok(None);
        }

        let strategy = RankingStrategy::ContentBased {
            affinity: affinity.iter().map(|genre| genre.id).collect(),
        };
        let items = self.rank_with(&strategy, user_id, params).await?;

        tracing::debug!(user_id, count = items.len(), "Content-based recommendations ranked");
        Ok(Some(items))
    }

    async fn try_popularity_based(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> AppResult<Vec<RecommendationItem>> {
        let items = self
            .rank_with(&RankingStrategy::PopularityBased, user_id, params)
            .await?;

        tracing::debug!(user_id, count = items.len(), "Popularity-based recommendations ranked");
        Ok(items)
    }

    /// Rating-ordered list used when a primary strategy cannot answer. Never fails.
    async fn fallback(
        &self,
        user_id: UserId,
        params: &RecommendationParameters,
        requested: RecommendationType,
    ) -> Vec<RecommendationItem> {
        let strategy = RankingStrategy::Fallback { requested };

        match self.rank_with(&strategy, user_id, params).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(
                    user_id,
                    strategy = %requested,
                    error = %e,
                    "Fallback recommendations failed, returning none"
                );
                Vec::new()
            }
        }
    }

    async fn rank_with(
        &self,
        strategy: &RankingStrategy,
        user_id: UserId,
        params: &RecommendationParameters,
    ) -> AppResult<Vec<RecommendationItem>> {
        let exclusion = profile::build_exclusion_set(
            self.interactions.as_ref(),
            user_id,
            params.exclude_user_books,
        )
        .await?;

        let query = strategy.candidate_query(params, &exclusion, &self.config);
        let candidates = self.catalog.candidates(&query).await?;

        Ok(strategy.rank(candidates, params, &exclusion, &self.config))
    }

    /// Adds a served response to the strategy's counters; failures are only logged
    async fn record_served(
        &self,
        recommendation_type: RecommendationType,
        items: &[RecommendationItem],
    ) {
        if items.is_empty() {
            return;
        }

        let score_sum: f64 = items.iter().map(|item| item.score).sum();
        if let Err(e) = self
            .feedback
            .record_served(recommendation_type, items.len() as i64, score_sum)
            .await
        {
            tracing::warn!(
                strategy = %recommendation_type,
                error = %e,
                "Failed to record served recommendations"
            );
        }
    }

    pub async fn record_feedback(
        &self,
        user_id: UserId,
        feedback: &FeedbackCreate,
    ) -> AppResult<RecommendationFeedback> {
        feedback::record_feedback(self.feedback.as_ref(), user_id, feedback).await
    }

    pub async fn stats(
        &self,
        recommendation_type: Option<RecommendationType>,
    ) -> AppResult<Vec<RecommendationStats>> {
        feedback::recommendation_stats(
            self.feedback.as_ref(),
            recommendation_type,
            self.config.assumed_served_per_strategy,
        )
        .await
    }

    /// Deterministic 64-character key for a request
    pub fn cache_key(
        &self,
        user_id: UserId,
        recommendation_type: RecommendationType,
        params: &RecommendationParameters,
    ) -> String {
        CacheKey::recommendations(user_id, recommendation_type, params).digest()
    }

    /// Forwards to the configured invalidation hook. With the default
    /// `NoopCache` nothing is evicted.
    pub fn invalidate_cache(&self, user_id: UserId) -> usize {
        self.cache.invalidate_user(user_id)
    }
}
