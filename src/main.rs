use std::sync::Arc;

use plottwist_recommender::{
    config::{Config, RecommenderConfig},
    db::{create_pool, run_migrations, PgStore},
    routes::{create_router, AppState},
    services::RecommendationEngine,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("plottwist_recommender=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let recommender_config = RecommenderConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let engine = RecommendationEngine::new(
        store.clone(),
        store.clone(),
        store,
        recommender_config,
    );

    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Recommendation service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
