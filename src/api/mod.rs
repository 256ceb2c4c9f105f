use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use chrono::FixedOffset;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{InMemoryTokenStore, TokenStore};
use crate::config::Config;
use crate::db::Store;

pub mod auth;
pub mod calls;
mod error;

pub use error::ApiError;

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub tokens: Arc<dyn TokenStore>,

    /// UTC offset applied to naive calldates at ingestion.
    pub server_tz: FixedOffset,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let server_tz = config.timezone()?;

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState {
        config,
        store,
        tokens: Arc::new(InMemoryTokenStore::new()),
        server_tz,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login/", post(auth::login))
        .route("/calls/create/", post(calls::create_call))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout/", post(auth::logout))
        .route("/auth/me/", get(auth::me))
        .route("/users/", get(auth::list_users))
        .route("/calls/bulk_create/", post(calls::bulk_create))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ))
}
