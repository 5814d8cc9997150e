use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use content_search::config::Config;
use content_search::content::repository::{
    ContentRepository, InMemoryContentRepository, PgContentRepository,
};
use content_search::db::{create_pool, ensure_schema};
use content_search::routes::build_router;
use content_search::search::ContentIndex;
use content_search::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting content search API v{}", env!("CARGO_PKG_VERSION"));

    let repo: Arc<dyn ContentRepository> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgContentRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; content is kept in memory and lost on exit");
            Arc::new(InMemoryContentRepository::new())
        }
    };

    let index = match &config.index_path {
        Some(path) => ContentIndex::open(path)?,
        None => ContentIndex::in_memory()?,
    };
    let state = AppState::new(repo, index, config.clone());

    // A persisted index is reused as-is. An empty one, or one paired with an
    // in-memory store that starts out empty, is rebuilt before serving.
    let indexed = state.content.indexed_count().await;
    if indexed == 0 || config.database_url.is_none() {
        let report = state.content.reindex().await?;
        info!("Search index ready ({} records)", report.indexed);
    } else {
        info!("Search index ready ({indexed} documents on disk)");
    }

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
