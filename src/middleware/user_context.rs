use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::request::Parts,
};

use crate::{error::AppError, models::UserId};

/// Header carrying the caller's user id, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, resolved from [`USER_ID_HEADER`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl CurrentUser {
    fn from_header(value: Option<&str>) -> Result<Self, AppError> {
        let raw = value.ok_or_else(|| {
            AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
        })?;

        match raw.trim().parse::<UserId>() {
            Ok(id) if id > 0 => Ok(CurrentUser(id)),
            _ => Err(AppError::Unauthorized(format!(
                "invalid {} header: {}",
                USER_ID_HEADER, raw
            ))),
        }
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok());

        Self::from_header(header)
    }
}

/// Tracing span for an HTTP request, tagged with the caller's user id
pub fn make_span_with_user(request: &Request<Body>) -> tracing::Span {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("anonymous");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        user_id = %user_id,
    )
}
