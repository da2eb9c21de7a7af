pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod image;
pub mod news;
pub mod render;
pub mod utils;

use serde::{Deserialize, Serialize};

pub use config::{ScraperConfig, SessionMode};
pub use error::{FetchError, FetchFailure, RenderError, ScrapeError};
pub use news::NewsService;

/// One article summary as listed on the site.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl ArticleRecord {
    pub fn new(title: String, link: String) -> Self {
        Self {
            title,
            link,
            description: String::new(),
            image_url: None,
        }
    }

    /// Missing thumbnails and the site's placeholder graphics both get
    /// looked up on the article page.
    pub fn needs_image(&self) -> bool {
        match &self.image_url {
            None => true,
            Some(url) => url.contains("placeholder"),
        }
    }
}
