use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use news_scraper::{FetchError, FetchFailure};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    News(#[from] FetchFailure),
    #[error("Missing url parameter")]
    MissingUrl,
    #[error("Error fetching image")]
    Proxy(#[source] FetchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::News(failure) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Could not fetch news for category {}.", failure.category),
                    "details": failure.source.to_string(),
                })),
            )
                .into_response(),
            ApiError::MissingUrl => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            ApiError::Proxy(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response(),
        }
    }
}
