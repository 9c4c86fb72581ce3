/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tankkeeper_api::{app::{build_router, AppState}, config::Config};
/// use tankkeeper_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tankkeeper_shared::auth::identity::IdentityResolver;
use tankkeeper_shared::dispatch::Dispatcher;
use tankkeeper_shared::repository::Repositories;
use tankkeeper_shared::store::DataStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Operation dispatcher over the repositories
    pub dispatcher: Dispatcher,

    /// Bearer token resolver
    pub resolver: IdentityResolver,

    /// Store backing both, kept for health checks
    pub store: Arc<dyn DataStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the dispatcher and resolver to one store
    pub fn new(store: Arc<dyn DataStore>, config: Config) -> Self {
        Self {
            dispatcher: Dispatcher::new(Repositories::new(Arc::clone(&store))),
            resolver: IdentityResolver::new(Arc::clone(&store), config.jwt.secret.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                 # Store connectivity (public)
/// └── /v1/
///     └── POST /rpc/:operation     # Operation catalogue
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Caller identity (`/v1` routes only)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no identity needed)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Operation routes: every request gets a CallerIdentity, anonymous or not
    let rpc_routes = Router::new()
        .route("/rpc/:operation", post(routes::rpc::call_operation))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::identity::resolve_identity,
        ));

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/v1", rpc_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
