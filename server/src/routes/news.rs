use axum::{routing::get, Router};
use crate::handlers::news_handlers::{get_news, image_proxy};

pub fn news_routes() -> Router {
    Router::new()
        .route("/news", get(get_news))
        .route("/image-proxy", get(image_proxy))
}
