//! Category listing service: cache, ordered extraction strategies and
//! image enrichment.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::browser::ChromiumSession;
use crate::cache::CategoryCache;
use crate::config::{ScraperConfig, SessionMode};
use crate::error::{FetchError, FetchFailure, ScrapeError};
use crate::extract::ListingExtractor;
use crate::fetcher::{HtmlFetcher, HttpFetcher};
use crate::image::ImageResolver;
use crate::render::{BrowserSession, RenderTimeouts, RenderingExtractor};
use crate::ArticleRecord;

pub const DEFAULT_CATEGORY: &str = "all";

/// One way of turning a listing URL into records. `Ok(vec![])` means
/// "nothing found, try the next one"; `Err` aborts the request.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, url: &str) -> Result<Vec<ArticleRecord>, ScrapeError>;
}

pub struct RenderStrategy(pub RenderingExtractor);

#[async_trait]
impl ExtractionStrategy for RenderStrategy {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn extract(&self, url: &str) -> Result<Vec<ArticleRecord>, ScrapeError> {
        Ok(self.0.extract(url).await?)
    }
}

/// Plain HTTP fetch of the listing, parsed without running scripts.
pub struct StaticStrategy {
    fetcher: Arc<dyn HtmlFetcher>,
    extractor: Arc<ListingExtractor>,
    timeout: Duration,
}

impl StaticStrategy {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, extractor: Arc<ListingExtractor>, timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor,
            timeout,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for StaticStrategy {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn extract(&self, url: &str) -> Result<Vec<ArticleRecord>, ScrapeError> {
        let html = self.fetcher.fetch(url, self.timeout).await?;
        Ok(self.extractor.extract(&html))
    }
}

pub struct NewsService {
    config: ScraperConfig,
    cache: CategoryCache,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    resolver: ImageResolver,
    session: Option<Arc<dyn BrowserSession>>,
}

impl NewsService {
    pub fn new(
        config: ScraperConfig,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        resolver: ImageResolver,
        session: Option<Arc<dyn BrowserSession>>,
    ) -> Self {
        Self {
            cache: CategoryCache::new(config.cache_ttl),
            config,
            strategies,
            resolver,
            session,
        }
    }

    /// Wires the production stack: Chromium rendering (unless disabled),
    /// then static HTML, with images resolved over HTTPS.
    pub fn from_config(config: ScraperConfig) -> Result<Self, FetchError> {
        let fetcher: Arc<dyn HtmlFetcher> = Arc::new(HttpFetcher::new(&config.user_agent)?);
        let session: Option<Arc<dyn BrowserSession>> = match config.session {
            SessionMode::Disabled => None,
            ref mode => Some(Arc::new(ChromiumSession::new(mode.clone())) as Arc<dyn BrowserSession>),
        };
        Ok(Self::with_session(config, fetcher, session))
    }

    pub fn with_session(
        config: ScraperConfig,
        fetcher: Arc<dyn HtmlFetcher>,
        session: Option<Arc<dyn BrowserSession>>,
    ) -> Self {
        let extractor = Arc::new(ListingExtractor::new(
            config.base_url.clone(),
            config.max_articles,
        ));

        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
        if let Some(session) = &session {
            strategies.push(Box::new(RenderStrategy(RenderingExtractor::new(
                session.clone(),
                extractor.clone(),
                config.user_agent.clone(),
                RenderTimeouts {
                    navigation: config.navigation_timeout,
                    network_idle: config.network_idle,
                    landmarks: config.landmark_timeout,
                },
            ))));
        }
        strategies.push(Box::new(StaticStrategy::new(
            fetcher.clone(),
            extractor,
            config.page_fetch_timeout,
        )));

        let resolver = ImageResolver::new(fetcher, config.base_url.clone(), config.page_fetch_timeout);
        Self::new(config, strategies, resolver, session)
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Starts the browser ahead of the first request. Failure is logged;
    /// the next request retries the start.
    pub async fn warm_up(&self) {
        if let Some(session) = &self.session {
            if let Err(e) = session.warm_up().await {
                warn!(error = %e, "browser warm-up failed");
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(session) = &self.session {
            session.shutdown().await;
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get_articles(&self, category: Option<&str>) -> Result<Vec<ArticleRecord>, FetchFailure> {
        let key = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        if let Some(entry) = self.cache.get(key) {
            info!(category = key, "serving from cache");
            return Ok(entry.data.as_ref().clone());
        }

        let articles = self.refresh(key).await.map_err(|source| FetchFailure {
            category: key.to_string(),
            source,
        })?;

        self.cache.put(key, articles.clone());
        info!(category = key, count = articles.len(), "cache updated");
        Ok(articles)
    }

    async fn refresh(&self, key: &str) -> Result<Vec<ArticleRecord>, ScrapeError> {
        let url = self
            .config
            .category_url(key)
            .ok_or_else(|| ScrapeError::InvalidUrl(key.to_string()))?;
        info!(category = key, %url, "cache empty or stale, scraping");

        let mut articles = Vec::new();
        for strategy in &self.strategies {
            articles = strategy.extract(url.as_str()).await?;
            info!(strategy = strategy.name(), count = articles.len(), "extraction finished");
            if !articles.is_empty() {
                break;
            }
            warn!(strategy = strategy.name(), %url, "no articles found");
        }

        Ok(self.enrich_images(articles).await)
    }

    /// Resolves images for every record that needs one, concurrently.
    /// Output order matches input order.
    async fn enrich_images(&self, articles: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        join_all(articles.into_iter().map(|mut article| async move {
            if article.needs_image() {
                if let Some(image) = self.resolver.resolve(&article.link).await {
                    article.image_url = Some(image);
                }
            }
            article
        }))
        .await
    }
}
