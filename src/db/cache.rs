//! Cache-key derivation and the invalidation seam for an external cache.
//!
//! No cache is wired in. `NoopCache` only logs: invalidating through it
//! evicts nothing. Deployments that put a cache in front of the engine plug
//! their own `CacheInvalidator` into the engine.

use sha2::{Digest, Sha256};
use std::fmt::Display;

use crate::models::{RecommendationParameters, RecommendationType, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Recommendations {
        user_id: UserId,
        recommendation_type: RecommendationType,
        params: RecommendationParameters,
    },
}

impl CacheKey {
    pub fn recommendations(
        user_id: UserId,
        recommendation_type: RecommendationType,
        params: &RecommendationParameters,
    ) -> Self {
        CacheKey::Recommendations {
            user_id,
            recommendation_type,
            params: params.clone(),
        }
    }

    /// Plain-text form hashed into the digest
    fn canonical(&self) -> String {
        match self {
            CacheKey::Recommendations {
                user_id,
                recommendation_type,
                params,
            } => {
                // An allow-list is a set; order and repeats don't change the request.
                let genres = params.genres.as_ref().map(|genres| {
                    let mut ids = genres.clone();
                    ids.sort_unstable();
                    ids.dedup();
                    ids
                });
                format!(
                    "rec_{}_{}_{}_{}_{:?}_{:?}",
                    user_id,
                    recommendation_type,
                    params.limit,
                    params.exclude_user_books,
                    params.min_rating,
                    genres
                )
            }
        }
    }

    /// Fixed-length (64 hex chars) SHA-256 digest of the key
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(self.canonical().as_bytes()))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

/// Hook invoked when a user's cached recommendations go stale
pub trait CacheInvalidator: Send + Sync {
    /// Drops every cached entry for the user, returning how many were evicted
    fn invalidate_user(&self, user_id: UserId) -> usize;
}

/// Invalidator used when no cache is deployed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl CacheInvalidator for NoopCache {
    fn invalidate_user(&self, user_id: UserId) -> usize {
        tracing::info!(user_id, "Cache invalidation requested; no cache configured");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(params: &RecommendationParameters) -> String {
        CacheKey::recommendations(42, RecommendationType::ContentBased, params).to_string()
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let params = RecommendationParameters::default();
        assert_eq!(key(&params), key(&params));
    }

    #[test]
    fn test_cache_key_is_fixed_length_hex() {
        let k = key(&RecommendationParameters::default());
        assert_eq!(k.len(), 64);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));

        let with_genres = key(&RecommendationParameters {
            genres: Some((1..40).collect()),
            ..Default::default()
        });
        assert_eq!(with_genres.len(), 64);
    }

    #[test]
    fn test_cache_key_changes_with_each_parameter() {
        let base = RecommendationParameters::default();
        let base_key = key(&base);

        let variants = [
            RecommendationParameters { limit: 5, ..base.clone() },
            RecommendationParameters { exclude_user_books: false, ..base.clone() },
            RecommendationParameters { min_rating: Some(4.0), ..base.clone() },
            RecommendationParameters { genres: Some(vec![3]), ..base.clone() },
        ];

        for variant in &variants {
            assert_ne!(key(variant), base_key, "{:?}", variant);
        }
    }

    #[test]
    fn test_cache_key_changes_with_user_and_strategy() {
        let params = RecommendationParameters::default();
        let base = CacheKey::recommendations(1, RecommendationType::ContentBased, &params);
        let other_user = CacheKey::recommendations(2, RecommendationType::ContentBased, &params);
        let other_type = CacheKey::recommendations(1, RecommendationType::PopularityBased, &params);

        assert_ne!(base.digest(), other_user.digest());
        assert_ne!(base.digest(), other_type.digest());
    }

    #[test]
    fn test_cache_key_ignores_genre_order() {
        let a = RecommendationParameters { genres: Some(vec![2, 1]), ..Default::default() };
        let b = RecommendationParameters { genres: Some(vec![1, 2, 2]), ..Default::default() };
        assert_eq!(key(&a), key(&b));
    }

    #[test]
    fn test_noop_cache_evicts_nothing() {
        assert_eq!(NoopCache.invalidate_user(42), 0);
    }
}
