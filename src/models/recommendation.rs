use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{BookId, BookSummary, GenreId, UserId};

/// Which ranking algorithm produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    ContentBased,
    PopularityBased,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::ContentBased => "content_based",
            RecommendationType::PopularityBased => "popularity_based",
        }
    }
}

impl Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content_based" => Ok(RecommendationType::ContentBased),
            "popularity_based" => Ok(RecommendationType::PopularityBased),
            other => Err(format!("Unknown recommendation type: {}", other)),
        }
    }
}

/// Caller-supplied knobs for a recommendation request
///
/// The engine assumes these were validated at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationParameters {
    pub limit: usize,
    pub exclude_user_books: bool,
    pub min_rating: Option<f64>,
    /// Genre allow-list, honoured by the popularity strategy only
    pub genres: Option<Vec<GenreId>>,
}

impl Default for RecommendationParameters {
    fn default() -> Self {
        Self {
            limit: 10,
            exclude_user_books: true,
            min_rating: None,
            genres: None,
        }
    }
}

/// A single ranked recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    pub book: BookSummary,
    pub score: f64,
    pub reason: String,
    pub recommendation_type: RecommendationType,
}

/// Response for a single-strategy request
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<RecommendationItem>,
    pub recommendation_type: RecommendationType,
    pub total_count: usize,
    pub generated_at: DateTime<Utc>,
    /// Key an external cache would store this response under
    pub cache_key: String,
}

/// Response carrying both strategies side by side
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationListResponse {
    pub user_id: UserId,
    pub content_based: Vec<RecommendationItem>,
    pub popularity_based: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
}

/// Feedback submission on a served recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackCreate {
    pub book_id: BookId,
    pub recommendation_type: RecommendationType,
    pub is_positive: bool,
    #[serde(default)]
    pub context_data: Option<String>,
}

/// Persisted thumbs-up/down signal. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationFeedback {
    pub id: i32,
    pub user_id: UserId,
    pub book_id: BookId,
    pub recommendation_type: RecommendationType,
    pub is_positive: bool,
    pub context_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Running totals of what a strategy has served
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServedTotals {
    pub recommendation_type: RecommendationType,
    pub served_count: i64,
    pub score_sum: f64,
}

/// Feedback analytics for one strategy, computed on demand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationStats {
    pub recommendation_type: RecommendationType,
    pub total_generated: i64,
    pub total_feedback: i64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    pub feedback_rate: f64,
    pub positive_rate: f64,
    pub avg_score: Option<f64>,
}
