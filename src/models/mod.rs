mod book;
mod recommendation;

pub use book::{BookId, BookSummary, Candidate, Genre, GenreAffinity, GenreId, UserId};
pub use recommendation::{
    FeedbackCreate, RecommendationFeedback, RecommendationItem, RecommendationListResponse,
    RecommendationParameters, RecommendationResponse, RecommendationStats, RecommendationType,
    ServedTotals,
};
