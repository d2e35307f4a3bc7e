/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use couchsport_api::{app::AppState, config::Config};
/// use couchsport_shared::db::memory::MemoryRepository;
/// use couchsport_shared::images::storage::LocalFileStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let files = LocalFileStore::new(&config.uploads.dir, &config.uploads.url_prefix).await?;
/// let state = AppState::new(Arc::new(MemoryRepository::new()), Arc::new(files), config);
/// let app = couchsport_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use couchsport_shared::{
    auth::{middleware::create_session_middleware, session::SessionStore},
    db::repository::Repository,
    images::storage::FileStore,
    stores::page::PageStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Persistence
    pub repo: Arc<dyn Repository>,

    /// Cookie sessions
    pub sessions: SessionStore,

    /// Page lifecycle and image ingestion
    pub pages: PageStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(repo: Arc<dyn Repository>, files: Arc<dyn FileStore>, config: Config) -> Self {
        Self {
            sessions: SessionStore::new(repo.clone(), config.session_config()),
            pages: PageStore::new(repo.clone(), files),
            repo,
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
/// ├── GET  /health              # Health check (public)
/// ├── GET  /activities          # Activity catalogue (public)
/// ├── POST /signup              # Account creation (public)
/// ├── POST /login               # Session cookie issuance (public)
/// ├── POST /logout              # Session destruction (session)
/// ├── /pages/
/// │   ├── GET  /                # List pages (public)
/// │   ├── GET  /mine            # Caller's pages (session)
/// │   ├── POST /new             # Create page (session)
/// │   ├── POST /update          # Update page (session, owner)
/// │   ├── POST /publish         # Toggle public flag (session, owner)
/// │   └── POST /delete          # Delete page (session, owner)
/// ├── /profiles/
/// │   ├── GET  /mine            # Caller's profile (session)
/// │   └── POST /update          # Update profile (session, owner)
/// ├── POST /images/delete       # Remove an image (session, owner)
/// └── GET  /uploads/*           # Stored images
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Body size limit
/// 5. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let session_layer = axum::middleware::from_fn(create_session_middleware(state.sessions.clone()));

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/activities", get(routes::activities::list_activities))
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/pages", get(routes::pages::list_pages));

    let session_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/pages/mine", get(routes::pages::my_pages))
        .route("/pages/new", post(routes::pages::create_page))
        .route("/pages/update", post(routes::pages::update_page))
        .route("/pages/publish", post(routes::pages::publish_page))
        .route("/pages/delete", post(routes::pages::delete_page))
        .route("/profiles/mine", get(routes::profiles::my_profile))
        .route("/profiles/update", post(routes::profiles::update_profile))
        .route("/images/delete", post(routes::images::delete_image))
        .layer(session_layer);

    let uploads = ServeDir::new(&state.config.uploads.dir);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
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
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .nest_service(&state.config.uploads.url_prefix, uploads)
        .layer(DefaultBodyLimit::max(state.config.api.max_body_bytes))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
