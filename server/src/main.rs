mod config;
mod error;
mod handlers;
mod routes;
mod state;
mod telemetry;

use news_scraper::fetcher::HttpFetcher;
use news_scraper::NewsService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let cfg = config::Config::load()?;

    let news = Arc::new(NewsService::from_config(cfg.scraper.clone())?);
    let images = HttpFetcher::new(&cfg.scraper.user_agent)?;

    // Browser start-up is slow; do it before the first request arrives.
    let warm = news.clone();
    tokio::spawn(async move { warm.warm_up().await });

    let app = routes::app(
        AppState::new(news.clone(), images),
        routes::cors_layer(cfg.client_url.as_deref()),
        &cfg.static_dir,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("closing browser session");
    news.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
