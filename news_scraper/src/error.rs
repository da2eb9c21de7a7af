use thiserror::Error;

/// Reaching a page over HTTP failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// The browser could not produce a rendered listing.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("browser session unavailable: {0}")]
    Session(String),
    #[error("navigation to {url} failed: {msg}")]
    Navigation { url: String, msg: String },
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("no article content appeared on {url}")]
    LandmarkTimeout { url: String },
    #[error("dom query failed: {0}")]
    Dom(String),
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("invalid url for category {0}")]
    InvalidUrl(String),
}

/// Top-level failure of a listing request. The cache is left untouched.
#[derive(Error, Debug)]
#[error("could not fetch news for category {category}: {source}")]
pub struct FetchFailure {
    pub category: String,
    #[source]
    pub source: ScrapeError,
}
