/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hearth_api::{app::{build_router, AppState}, config::Config};
/// use hearth_shared::store::MemoryStore;
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

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use hearth_shared::auth::middleware::create_identity_middleware;
use hearth_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler via `State`; both fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Lifetime of issued session tokens
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.jwt.ttl_hours)
    }
}

/// Builds the complete Axum router
///
/// ```text
/// /
/// ├── GET  /health
/// └── /api/                         identity middleware on everything below
///     ├── /auth/
///     │   ├── POST /register
///     │   └── POST /login
///     ├── /household/
///     │   ├── POST /invite
///     │   ├── GET  /invites
///     │   └── POST /join
///     ├── /recipes
///     │   ├── GET  /               (optional auth)
///     │   ├── POST /
///     │   └── GET  /:id            (id or slug, optional auth)
///     └── /users/
///         ├── POST   /preferences
///         ├── GET    /me
///         ├── PUT    /favorites/:recipe_id
///         └── DELETE /favorites/:recipe_id
/// ```
///
/// Layers, innermost first: identity (on `/api`), tracing, CORS, security
/// headers.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let household_routes = Router::new()
        .route("/invite", post(routes::household::invite))
        .route("/invites", get(routes::household::list_invites))
        .route("/join", post(routes::household::join));

    let recipe_routes = Router::new()
        .route(
            "/",
            get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
        )
        .route("/:id", get(routes::recipes::get_recipe));

    let user_routes = Router::new()
        .route("/preferences", post(routes::users::update_preferences))
        .route("/me", get(routes::users::me))
        .route(
            "/favorites/:recipe_id",
            put(routes::users::add_favorite).delete(routes::users::remove_favorite),
        );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/household", household_routes)
        .nest("/recipes", recipe_routes)
        .nest("/users", user_routes)
        .layer(axum::middleware::from_fn(create_identity_middleware(
            state.jwt_secret().to_string(),
        )));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
