use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::extract::{attr, selector};
use crate::fetcher::HtmlFetcher;

/// Looks up an authoritative image for an article from its own page.
pub struct ImageResolver {
    fetcher: Arc<dyn HtmlFetcher>,
    base_url: Url,
    timeout: Duration,
    og_image: Selector,
    twitter_image: Selector,
    article_img: Selector,
    content_img: Selector,
}

impl ImageResolver {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, base_url: Url, timeout: Duration) -> Self {
        Self {
            fetcher,
            base_url,
            timeout,
            og_image: selector(r#"meta[property="og:image"]"#),
            twitter_image: selector(r#"meta[name="twitter:image"]"#),
            article_img: selector("article img"),
            content_img: selector(".entry-content img, .td-post-content img"),
        }
    }

    /// Never fails: an unreachable page just means no image.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, article_url: &str) -> Option<String> {
        if article_url.is_empty() {
            return None;
        }
        match self.fetcher.fetch(article_url, self.timeout).await {
            Ok(html) => self.find_image(&html),
            Err(e) => {
                warn!(url = %article_url, error = %e, "could not fetch article for image");
                None
            }
        }
    }

    /// Open Graph, then Twitter card, then the first image in the article
    /// body, then the first image in the theme's content block.
    pub fn find_image(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);

        let metas = [&self.og_image, &self.twitter_image]
            .into_iter()
            .filter_map(|sel| doc.select(sel).next())
            .filter_map(|el| attr(el, "content"));
        let article = doc
            .select(&self.article_img)
            .next()
            .and_then(|el| attr(el, "src"));
        // Either theme's content block, whichever comes first in the page.
        let content = doc
            .select(&self.content_img)
            .next()
            .and_then(|el| attr(el, "src"));

        let found = metas
            .chain(article)
            .chain(content)
            .find_map(|candidate| self.base_url.join(candidate).ok())
            .map(|u| u.to_string());

        debug!(image = ?found, "image lookup");
        found
    }
}
