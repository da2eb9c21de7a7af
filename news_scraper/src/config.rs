use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://congan.quangtri.gov.vn/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MAX_ARTICLES: usize = 30;

/// How the shared browser is provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// Launch a headless Chromium owned by this process.
    Local { executable: Option<PathBuf> },
    /// Attach to an externally hosted browser over its DevTools websocket.
    Remote { ws_url: String },
    /// No browser at all; only static HTML extraction runs.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: Url,
    pub cache_ttl: Duration,
    pub max_articles: usize,
    pub page_fetch_timeout: Duration,
    pub navigation_timeout: Duration,
    pub network_idle: Duration,
    pub landmark_timeout: Duration,
    pub user_agent: String,
    pub session: SessionMode,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            cache_ttl: Duration::from_secs(10 * 60),
            max_articles: MAX_ARTICLES,
            page_fetch_timeout: Duration::from_secs(20),
            navigation_timeout: Duration::from_secs(30),
            network_idle: Duration::from_millis(500),
            landmark_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            session: SessionMode::Local { executable: None },
        }
    }
}

impl ScraperConfig {
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_session(mut self, session: SessionMode) -> Self {
        self.session = session;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Listing URL for a category key: the site root for `"all"`,
    /// otherwise `category/{key}/` below it.
    pub fn category_url(&self, key: &str) -> Option<Url> {
        if key == "all" {
            Some(self.base_url.clone())
        } else {
            self.base_url.join(&format!("category/{key}/")).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_urls() {
        let cfg = ScraperConfig::default();
        assert_eq!(
            cfg.category_url("all").unwrap().as_str(),
            "https://congan.quangtri.gov.vn/"
        );
        assert_eq!(
            cfg.category_url("tin-tuc").unwrap().as_str(),
            "https://congan.quangtri.gov.vn/category/tin-tuc/"
        );
    }
}
