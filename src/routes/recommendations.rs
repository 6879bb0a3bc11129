use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{
        FeedbackCreate, GenreId, RecommendationFeedback, RecommendationListResponse,
        RecommendationParameters, RecommendationResponse, RecommendationStats, RecommendationType,
        UserId,
    },
    routes::AppState,
};

const MAX_LIMIT: usize = 50;
const MAX_LIMIT_PER_TYPE: usize = 25;
const MAX_CONTEXT_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
    pub exclude_user_books: Option<bool>,
    pub min_rating: Option<f64>,
    /// Comma-separated genre ids
    pub genres: Option<String>,
}

impl RecommendationQuery {
    /// Validates the raw query and applies defaults
    pub fn into_params(self, max_limit: usize) -> AppResult<RecommendationParameters> {
        let defaults = RecommendationParameters::default();

        let limit = self.limit.unwrap_or(defaults.limit);
        if !(1..=max_limit).contains(&limit) {
            return Err(AppError::InvalidInput(format!(
                "Limit must be between 1 and {}",
                max_limit
            )));
        }

        if let Some(min_rating) = self.min_rating {
            if !(0.0..=5.0).contains(&min_rating) {
                return Err(AppError::InvalidInput(
                    "Min rating must be between 0.0 and 5.0".to_string(),
                ));
            }
        }

        let genres = self.genres.as_deref().map(parse_genres).transpose()?;

        Ok(RecommendationParameters {
            limit,
            exclude_user_books: self.exclude_user_books.unwrap_or(defaults.exclude_user_books),
            min_rating: self.min_rating,
            genres,
        })
    }
}

fn parse_genres(raw: &str) -> AppResult<Vec<GenreId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<GenreId>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid genre id: {}", part)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub recommendation_type: Option<String>,
}

async fn single_strategy(
    state: &AppState,
    user_id: UserId,
    recommendation_type: RecommendationType,
    params: RecommendationParameters,
) -> RecommendationResponse {
    let recommendations = state
        .engine
        .recommend(user_id, recommendation_type, &params)
        .await;

    RecommendationResponse {
        user_id,
        total_count: recommendations.len(),
        recommendations,
        recommendation_type,
        generated_at: Utc::now(),
        cache_key: state.engine.cache_key(user_id, recommendation_type, &params),
    }
}

/// Handler for content-based recommendations
pub async fn content_based(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Query(query) = query?;
    let params = query.into_params(MAX_LIMIT)?;
    let response =
        single_strategy(&state, user_id, RecommendationType::ContentBased, params).await;
    Ok(Json(response))
}

/// Handler for popularity-based recommendations
pub async fn popularity_based(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Query(query) = query?;
    let params = query.into_params(MAX_LIMIT)?;
    let response =
        single_strategy(&state, user_id, RecommendationType::PopularityBased, params).await;
    Ok(Json(response))
}

/// Handler returning both strategies at once
pub async fn all(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationListResponse>> {
    let Query(query) = query?;

    // The combined view takes no genre filter.
    let params = RecommendationQuery {
        genres: None,
        ..query
    }
    .into_params(MAX_LIMIT_PER_TYPE)?;

    let (content_based, popularity_based) = state.engine.recommend_all(user_id, &params).await;

    Ok(Json(RecommendationListResponse {
        user_id,
        content_based,
        popularity_based,
        generated_at: Utc::now(),
    }))
}

/// Handler for recording feedback on a served recommendation
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    request: Result<Json<FeedbackCreate>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RecommendationFeedback>)> {
    let Json(request) = request?;
    if let Some(context) = &request.context_data {
        if context.chars().count() > MAX_CONTEXT_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Context data cannot exceed {} characters",
                MAX_CONTEXT_CHARS
            )));
        }
    }

    let saved = state.engine.record_feedback(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Handler for feedback analytics
pub async fn stats(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<RecommendationStats>>> {
    let Query(query) = query?;
    let recommendation_type = query
        .recommendation_type
        .as_deref()
        .map(str::parse::<RecommendationType>)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let stats = state.engine.stats(recommendation_type).await?;
    Ok(Json(stats))
}

/// Handler for the cache invalidation hook
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Value> {
    let evicted = state.engine.invalidate_cache(user_id);
    Json(json!({
        "message": "Cache invalidated successfully",
        "evicted": evicted
    }))
}
