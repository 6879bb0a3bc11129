pub mod cache;
pub mod postgres;
pub mod store;

pub use cache::{CacheInvalidator, CacheKey, NoopCache};
pub use postgres::{create_pool, run_migrations, PgStore};
pub use store::{CandidateQuery, CatalogStore, FeedbackStore, InteractionStore};
