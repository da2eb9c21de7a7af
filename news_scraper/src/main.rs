use clap::Parser;
use dotenv::dotenv;
use news_scraper::{utils, NewsService, ScraperConfig, SessionMode};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape one news listing and write it as JSON", long_about = None)]
struct Args {
    /// Category key; "all" is the front page
    #[arg(short, long, default_value = "all")]
    category: String,

    /// Where to write the JSON array
    #[arg(short, long, default_value = "result.json")]
    output: PathBuf,

    /// Site root
    #[arg(long, env = "SITE_BASE_URL", default_value = news_scraper::config::DEFAULT_BASE_URL)]
    base_url: Url,

    /// DevTools websocket of a hosted browser instead of a local launch
    #[arg(long, env = "BROWSER_WS_URL")]
    browser_ws: Option<String>,

    /// Chrome/Chromium binary for local launch
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Skip the browser and parse the raw HTML only
    #[arg(short, long)]
    static_only: bool,
}

impl Args {
    fn session_mode(&self) -> SessionMode {
        if self.static_only {
            SessionMode::Disabled
        } else if let Some(ws_url) = &self.browser_ws {
            SessionMode::Remote { ws_url: ws_url.clone() }
        } else {
            SessionMode::Local { executable: self.chrome.clone() }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = ScraperConfig::default()
        .with_base_url(args.base_url.clone())
        .with_session(args.session_mode());
    let service = NewsService::from_config(config)?;

    let result = service.get_articles(Some(&args.category)).await;
    service.shutdown().await;

    let articles = match result {
        Ok(articles) => articles,
        Err(e) => {
            error!(error = %e, "scrape failed");
            return Err(e.into());
        }
    };

    if articles.is_empty() {
        info!(category = %args.category, "no articles found");
    }
    utils::save_json(&articles, &args.output)?;
    Ok(())
}
