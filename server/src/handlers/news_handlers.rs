use axum::{
    body::Body,
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use news_scraper::ArticleRecord;
use serde::Deserialize;
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
}

/// GET /api/news?category=<key>
pub async fn get_news(
    Extension(state): Extension<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Vec<ArticleRecord>>, ApiError> {
    match state.news.get_articles(query.category.as_deref()).await {
        Ok(articles) => Ok(Json(articles)),
        Err(failure) => {
            error!(category = %failure.category, error = %failure.source, "news request failed");
            Err(failure.into())
        }
    }
}

#[derive(Deserialize)]
pub struct ImageProxyQuery {
    pub url: Option<String>,
}

/// GET /api/image-proxy?url=<imageUrl>
///
/// Streams the upstream body as-is, with its status and content type.
pub async fn image_proxy(
    Extension(state): Extension<AppState>,
    Query(query): Query<ImageProxyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let url = query.url.filter(|u| !u.is_empty()).ok_or(ApiError::MissingUrl)?;

    let timeout = state.news.config().page_fetch_timeout;
    let upstream = state.images.open(&url, Some(timeout)).await.map_err(|e| {
        error!(%url, error = %e, "image proxy error");
        ApiError::Proxy(e)
    })?;

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

pub async fn health() -> &'static str {
    "ok"
}
