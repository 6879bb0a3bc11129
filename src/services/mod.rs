pub mod feedback;
pub mod profile;
pub mod recommendations;
pub mod scoring;

pub use recommendations::RecommendationEngine;
pub use scoring::RankingStrategy;
