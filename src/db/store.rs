//! Collaborator capabilities the recommendation engine consumes.
//!
//! The engine never talks to the database directly; it depends on these
//! traits so the Postgres store, test fixtures and mocks are interchangeable.

use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{
        BookId, Candidate, FeedbackCreate, GenreAffinity, GenreId, RecommendationFeedback,
        RecommendationType, ServedTotals, UserId,
    },
};

/// Shape of a candidate query against the catalog
///
/// Results are ordered by mean rating, then review count, then favorite
/// count (all descending), then book id ascending, and bounded by `limit`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateQuery {
    /// Only books tagged with at least one of these genres
    pub genre_ids: Option<Vec<GenreId>>,
    /// Minimum number of existing reviews
    pub min_reviews: i64,
    /// Minimum mean rating
    pub min_rating: Option<f64>,
    /// Books to leave out entirely
    pub exclude: HashSet<BookId>,
    pub limit: usize,
}

/// Read-only aggregate queries over the book catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Genres attached to the user's favorited books, most frequent first
    async fn favorite_genres(&self, user_id: UserId) -> AppResult<Vec<GenreAffinity>>;

    /// Books with their quality signals and genre tags
    async fn candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Candidate>>;
}

/// Per-user interaction lookups
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    async fn favorited_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>>;

    async fn reviewed_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>>;
}

/// Append-only storage for recommendation feedback and serve counters
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Persists one feedback row and returns it with id and timestamp assigned
    async fn insert_feedback(
        &self,
        user_id: UserId,
        feedback: &FeedbackCreate,
    ) -> AppResult<RecommendationFeedback>;

    /// All feedback rows, optionally restricted to one strategy
    async fn list_feedback(
        &self,
        recommendation_type: Option<RecommendationType>,
    ) -> AppResult<Vec<RecommendationFeedback>>;

    /// Adds a served response to the strategy's running totals
    async fn record_served(
        &self,
        recommendation_type: RecommendationType,
        item_count: i64,
        score_sum: f64,
    ) -> AppResult<()>;

    /// Running totals for every strategy that has served anything
    async fn served_totals(&self) -> AppResult<Vec<ServedTotals>>;
}
