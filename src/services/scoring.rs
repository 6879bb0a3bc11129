//! Ranking strategies: candidate selection, scoring and justification text.
//!
//! Everything here is pure. The engine fetches candidates through the
//! catalog store and hands them to a [`RankingStrategy`] for ranking.

use std::collections::HashSet;

use crate::{
    config::RecommenderConfig,
    db::CandidateQuery,
    models::{
        BookId, Candidate, GenreId, RecommendationItem, RecommendationParameters,
        RecommendationType,
    },
};

/// The closed set of ranking algorithms
#[derive(Debug, Clone, PartialEq)]
pub enum RankingStrategy {
    /// Genre-affinity overlap blended with quality signals
    ContentBased { affinity: Vec<GenreId> },
    /// Global quality signals only
    PopularityBased,
    /// Minimal rating-ordered list, stamped with the strategy that was requested
    Fallback { requested: RecommendationType },
}

impl RankingStrategy {
    /// Strategy tag stamped on every produced item
    pub fn recommendation_type(&self) -> RecommendationType {
        match self {
            RankingStrategy::ContentBased { .. } => RecommendationType::ContentBased,
            RankingStrategy::PopularityBased => RecommendationType::PopularityBased,
            RankingStrategy::Fallback { requested } => *requested,
        }
    }

    /// Builds the catalog query that bounds the candidate set
    pub fn candidate_query(
        &self,
        params: &RecommendationParameters,
        exclusion: &HashSet<BookId>,
        config: &RecommenderConfig,
    ) -> CandidateQuery {
        let pool = params.limit * config.candidate_pool_factor.max(1);

        match self {
            RankingStrategy::ContentBased { affinity } => CandidateQuery {
                genre_ids: Some(affinity.clone()),
                min_reviews: config.content_min_reviews,
                min_rating: params.min_rating,
                exclude: exclusion.clone(),
                limit: pool,
            },
            RankingStrategy::PopularityBased => CandidateQuery {
                genre_ids: genre_allow_list(params).map(<[GenreId]>::to_vec),
                min_reviews: config.popularity_min_reviews,
                min_rating: params.min_rating,
                exclude: exclusion.clone(),
                limit: pool,
            },
            RankingStrategy::Fallback { .. } => CandidateQuery {
                genre_ids: None,
                min_reviews: config.fallback_min_reviews,
                min_rating: None,
                exclude: exclusion.clone(),
                limit: params.limit,
            },
        }
    }

    /// Whether a candidate is eligible under this strategy
    ///
    /// Stores push the same predicates down into their queries; they are
    /// re-checked here so the exclusion and rating invariants hold for any store.
    pub fn admits(
        &self,
        candidate: &Candidate,
        params: &RecommendationParameters,
        exclusion: &HashSet<BookId>,
        config: &RecommenderConfig,
    ) -> bool {
        if exclusion.contains(&candidate.id()) {
            return false;
        }

        match self {
            RankingStrategy::ContentBased { affinity } => {
                candidate.review_count >= config.content_min_reviews
                    && meets_rating_floor(candidate, params.min_rating)
                    && candidate.genre_ids().any(|id| affinity.contains(&id))
            }
            RankingStrategy::PopularityBased => {
                candidate.review_count >= config.popularity_min_reviews
                    && meets_rating_floor(candidate, params.min_rating)
                    && genre_allow_list(params)
                        .map_or(true, |allowed| candidate.genre_ids().any(|id| allowed.contains(&id)))
            }
            RankingStrategy::Fallback { .. } => {
                candidate.review_count >= config.fallback_min_reviews
            }
        }
    }

    /// Score and human-readable justification for one candidate
    pub fn score(&self, candidate: &Candidate, config: &RecommenderConfig) -> (f64, String) {
        match self {
            RankingStrategy::ContentBased { affinity } => {
                (content_score(candidate, affinity, config), content_reason(candidate, affinity))
            }
            RankingStrategy::PopularityBased => {
                (popularity_score(candidate, config), popularity_reason(candidate))
            }
            RankingStrategy::Fallback { .. } => {
                (rating_signal(candidate), fallback_reason(candidate))
            }
        }
    }

    /// Filters, scores and orders candidates, returning at most `params.limit` items
    ///
    /// Candidates must arrive in catalog order (mean rating, review count,
    /// favorite count). The sort is stable, so equal scores keep that order.
    pub fn rank(
        &self,
        candidates: Vec<Candidate>,
        params: &RecommendationParameters,
        exclusion: &HashSet<BookId>,
        config: &RecommenderConfig,
    ) -> Vec<RecommendationItem> {
        let recommendation_type = self.recommendation_type();

        let mut items: Vec<RecommendationItem> = candidates
            .into_iter()
            .filter(|c| self.admits(c, params, exclusion, config))
            .map(|candidate| {
                let (score, reason) = self.score(&candidate, config);
                RecommendationItem {
                    book: candidate.book,
                    score: round3(score),
                    reason,
                    recommendation_type,
                }
            })
            .collect();

        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items.truncate(params.limit);
        items
    }
}

/// Non-empty genre allow-list from the request, if any
fn genre_allow_list(params: &RecommendationParameters) -> Option<&[GenreId]> {
    params.genres.as_deref().filter(|genres| !genres.is_empty())
}

fn meets_rating_floor(candidate: &Candidate, min_rating: Option<f64>) -> bool {
    match min_rating {
        Some(floor) => candidate.average_rating.is_some_and(|rating| rating >= floor),
        None => true,
    }
}

/// Mean rating normalised to [0, 1]; 0 without reviews
fn rating_signal(candidate: &Candidate) -> f64 {
    candidate.average_rating.map_or(0.0, |rating| rating / 5.0)
}

fn saturating_ratio(count: i64, saturation: f64) -> f64 {
    (count as f64 / saturation).min(1.0)
}

/// `genre_weight * overlap + quality_weight * quality`
pub fn content_score(candidate: &Candidate, affinity: &[GenreId], config: &RecommenderConfig) -> f64 {
    let genre_score = if affinity.is_empty() {
        0.0
    } else {
        let overlap = candidate
            .genre_ids()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|id| affinity.contains(id))
            .count();
        overlap as f64 / affinity.len() as f64
    };

    let quality_score = config.quality_rating_weight * rating_signal(candidate)
        + config.quality_review_weight
            * saturating_ratio(candidate.review_count, config.review_saturation);

    config.genre_weight * genre_score + config.quality_weight * quality_score
}

pub fn popularity_score(candidate: &Candidate, config: &RecommenderConfig) -> f64 {
    config.popularity_rating_weight * rating_signal(candidate)
        + config.popularity_review_weight
            * saturating_ratio(candidate.review_count, config.review_saturation)
        + config.popularity_favorite_weight
            * saturating_ratio(candidate.favorite_count, config.favorite_saturation)
}

fn content_reason(candidate: &Candidate, affinity: &[GenreId]) -> String {
    let matched: Vec<&str> = candidate
        .book
        .genres
        .iter()
        .filter(|genre| affinity.contains(&genre.id))
        .map(|genre| genre.name.as_str())
        .collect();

    let shown = &matched[..matched.len().min(2)];
    let mut reason = format!("Similar to your favorites in {}", shown.join(", "));
    if matched.len() > 2 {
        reason.push_str(&format!(" and {} other genre(s)", matched.len() - 2));
    }
    reason
}

fn popularity_reason(candidate: &Candidate) -> String {
    let mut reason = format!(
        "Highly rated ({:.1}★) with {} reviews",
        candidate.average_rating.unwrap_or(0.0),
        candidate.review_count
    );
    if candidate.favorite_count > 0 {
        reason.push_str(&format!(" and {} favorites", candidate.favorite_count));
    }
    reason
}

fn fallback_reason(candidate: &Candidate) -> String {
    match candidate.average_rating {
        Some(rating) => format!("Trending book ({:.1}★)", rating),
        None => "Popular book".to_string(),
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
