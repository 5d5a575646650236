pub mod auth;
pub mod config;
pub mod covers;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod routes;
pub mod serializers;
pub mod validation;

pub const STATIC_HASH: &str = env!("STATIC_HASH");

use std::path::PathBuf;

use axum::http::{header, HeaderValue};
use axum::{routing::get, Router};
use sqlx::SqlitePool;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Uploaded covers live here; `recipes.cover` is relative to it.
    pub media_root: PathBuf,
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `pool` beforehand.
/// This function sets up the session store (and migrates its table), then
/// assembles all route modules, middleware, and state.
pub async fn build_app(
    pool: SqlitePool,
    media_root: PathBuf,
    secure_cookies: bool,
) -> Result<Router, sqlx::Error> {
    let session_store = SqliteStore::new(pool.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(14)))
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    let media = ServeDir::new(&media_root);
    let state = AppState {
        db: pool,
        media_root,
    };

    Ok(Router::new()
        .route("/health", get(health))
        .merge(routes::authors::router())
        .merge(routes::recipes::router())
        .merge(routes::tags::router())
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=86400"),
                ))
                .service(ServeDir::new("static")),
        )
        .nest_service("/media", media)
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state))
}
