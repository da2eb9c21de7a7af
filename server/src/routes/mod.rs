pub mod news;

use axum::{http::{HeaderValue, Method}, routing::get, Extension, Router};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::handlers::news_handlers::health;
use crate::state::AppState;
use self::news::news_routes;

pub fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    match client_url.map(|u| u.parse::<HeaderValue>()) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::OPTIONS]),
        Some(Err(e)) => {
            warn!(error = %e, "CLIENT_URL is not a valid origin, allowing any");
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}

pub fn app(state: AppState, cors: CorsLayer, static_dir: &Path) -> Router {
    Router::new()
        .nest("/api", news_routes())
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
