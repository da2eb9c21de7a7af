use news_scraper::{ScraperConfig, SessionMode};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
    pub client_url: Option<String>,
    pub scraper: ScraperConfig,
}

fn default_port() -> u16 { 3000 }

impl Config {
    pub fn load() -> Result<Self, url::ParseError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, url::ParseError> {
        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_port());
        let static_dir = get("STATIC_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let client_url = get("CLIENT_URL").filter(|v| !v.is_empty());

        let mut scraper = ScraperConfig::default();
        if let Some(base) = get("SITE_BASE_URL") {
            scraper = scraper.with_base_url(Url::parse(&base)?);
        }
        if let Some(secs) = get("CACHE_TTL_SECS").and_then(|v| v.parse::<u64>().ok()) {
            scraper = scraper.with_cache_ttl(Duration::from_secs(secs));
        }
        let session = match get("BROWSER_WS_URL").filter(|v| !v.is_empty()) {
            Some(ws_url) => SessionMode::Remote { ws_url },
            None => SessionMode::Local { executable: get("CHROME_PATH").map(PathBuf::from) },
        };
        scraper = scraper.with_session(session);

        Ok(Self { port, static_dir, client_url, scraper })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, url::ParseError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.static_dir, PathBuf::from("."));
        assert_eq!(cfg.scraper.cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.scraper.session, SessionMode::Local { executable: None });
    }

    #[test]
    fn overrides_and_bad_port_fallback() {
        let cfg = load(&[
            ("PORT", "not-a-port"),
            ("BROWSER_WS_URL", "wss://browser.test?token=x"),
            ("CACHE_TTL_SECS", "30"),
            ("SITE_BASE_URL", "https://mirror.test/"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.scraper.cache_ttl, Duration::from_secs(30));
        assert_eq!(cfg.scraper.base_url.as_str(), "https://mirror.test/");
        assert_eq!(
            cfg.scraper.session,
            SessionMode::Remote { ws_url: "wss://browser.test?token=x".into() }
        );
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        assert!(load(&[("SITE_BASE_URL", "not a url")]).is_err());
    }
}
