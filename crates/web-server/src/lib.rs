use analytics::StatisticsEngine;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use configuration::{Config, DatabaseSettings};
use database::{DbRepository, MemoryStore, PoolSettings, StrategyStore, TradeRecordStore};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
///
/// Stores are injected so the same router serves Postgres in production and
/// the in-memory store in tests or `--in-memory` runs.
#[derive(Clone)]
pub struct AppState {
    pub trades: Arc<dyn TradeRecordStore>,
    pub strategies: Arc<dyn StrategyStore>,
    pub engine: StatisticsEngine,
}

impl AppState {
    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            trades: store.clone(),
            strategies: store,
            engine: StatisticsEngine::new(),
        }
    }

    pub fn postgres(repo: DbRepository) -> Self {
        let repo = Arc::new(repo);
        Self {
            trades: repo.clone(),
            strategies: repo,
            engine: StatisticsEngine::new(),
        }
    }

    /// Connects to Postgres with the configured pool and applies pending
    /// migrations when enabled.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let pool = database::connect(PoolSettings {
            max_connections: settings.max_connections,
            acquire_timeout: settings.acquire_timeout(),
        })
        .await?;
        if settings.run_migrations {
            database::run_migrations(&pool).await?;
        }
        Ok(Self::postgres(DbRepository::new(pool)))
    }
}

/// Builds the API router with CORS, request tracing and a body size limit.
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/trades",
            get(handlers::list_trades).post(handlers::create_trade),
        )
        .route(
            "/api/trades/:id",
            get(handlers::get_trade)
                .put(handlers::update_trade)
                .delete(handlers::delete_trade),
        )
        .route("/api/statistics", get(handlers::get_statistics))
        .route(
            "/api/strategies",
            get(handlers::list_strategies).post(handlers::create_strategy),
        )
        .route(
            "/api/strategies/:id",
            get(handlers::get_strategy)
                .put(handlers::update_strategy)
                .delete(handlers::delete_strategy),
        )
        .with_state(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// Binds the configured address and serves the API until the process exits.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let addr = config.server.socket_addr();
    let app = build_router(state, config.server.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Web server started.");
    axum::serve(listener, app).await?;

    Ok(())
}
