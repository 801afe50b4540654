use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::DatabaseManager;
use crate::handlers;
use crate::middleware::security_context_middleware;
use crate::query::CacheScope;
use crate::store::{JsonExecutor, PgExecutor, Store, StoreOptions};

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<AppConfig>,
    /// Cancelled on shutdown; each request runs under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Store, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Scope for read queries; writes never cache
    pub fn read_cache_scope(&self) -> CacheScope {
        if self.config.cache.enabled && self.store.cache().is_some() {
            self.config.cache.scope
        } else {
            CacheScope::None
        }
    }
}

/// Store with the configured logging and, if enabled, a TTL cache
pub fn build_store(executor: Arc<dyn JsonExecutor>, config: &AppConfig) -> Store {
    let store = Store::new(executor).with_options(StoreOptions::from(&config.database));
    if config.cache.enabled {
        store.with_cache(Arc::new(QueryCache::new(Duration::from_secs(config.cache.ttl_secs))))
    } else {
        store
    }
}

pub fn app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let records = Router::new()
        .route(
            "/api/:schema/:table",
            get(handlers::table_list).post(handlers::table_post),
        )
        .route(
            "/api/:schema/:table/:record",
            get(handlers::record_get)
                .patch(handlers::record_patch)
                .delete(handlers::record_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), security_context_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(records);

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Connect, bind and serve until ctrl-c
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting rowgate in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    let executor: Arc<dyn JsonExecutor> = Arc::new(PgExecutor::new(pool.clone()));
    let port = config.api.port;
    let store = build_store(executor, &config);
    let state = AppState::new(store, Arc::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("rowgate listening on http://{}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    pool.close().await;
    info!("Database pool closed");
    Ok(())
}
