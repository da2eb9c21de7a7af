//! Listing extraction from an HTML document.
//!
//! The selectors follow the site's WordPress theme (tagDiv "td-" markup).
//! Container selectors are tried from most to least specific and the first
//! one matching anything wins; inside a container, each field has its own
//! ordered selector list and the first hit is used.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::ArticleRecord;

pub const CONTAINER_SELECTORS: [&str; 5] = [
    ".td-block-span6",
    ".td-module-container",
    "article.td-post",
    ".td-animation-stack",
    ".item-details",
];

pub const TITLE_SELECTORS: [&str; 4] = [
    "h3.entry-title a",
    ".td-module-title a",
    "a.td-image-wrap + h3 a",
    "h3 a",
];

pub const DESCRIPTION_SELECTORS: [&str; 3] =
    [".td-excerpt", ".entry-content", ".td-post-text-excerpt"];

pub const IMAGE_SELECTORS: [&str; 3] = ["img.entry-thumb", ".td-module-thumb img", "img"];

/// Checked in order when an image has no usable `src`.
pub const LAZY_IMAGE_ATTRS: [&str; 3] = ["data-img-url", "data-src", "data-lazy-src"];

/// Any of these present means the listing has rendered.
pub const LANDMARK_SELECTOR: &str = "article, .td-module-thumb, .entry-title";

pub(crate) fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("static selector is valid")
}

pub(crate) fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|s| selector(s)).collect()
}

/// First element matched by the earliest selector in `selectors` that
/// matches anything below `scope`.
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| scope.select(sel).next())
}

pub(crate) fn clean_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty attribute value, trimmed.
pub(crate) fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub struct ListingExtractor {
    base_url: Url,
    max_articles: usize,
    containers: Vec<Selector>,
    titles: Vec<Selector>,
    descriptions: Vec<Selector>,
    images: Vec<Selector>,
}

impl ListingExtractor {
    pub fn new(base_url: Url, max_articles: usize) -> Self {
        Self {
            base_url,
            max_articles,
            containers: compile(&CONTAINER_SELECTORS),
            titles: compile(&TITLE_SELECTORS),
            descriptions: compile(&DESCRIPTION_SELECTORS),
            images: compile(&IMAGE_SELECTORS),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn extract(&self, html: &str) -> Vec<ArticleRecord> {
        let doc = Html::parse_document(html);

        let Some(container_sel) = self
            .containers
            .iter()
            .find(|sel| doc.select(sel).next().is_some())
        else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut articles = Vec::new();

        for container in doc.select(container_sel).take(self.max_articles) {
            let Some(record) = self.record(container) else {
                continue;
            };
            if seen.insert(record.link.clone()) {
                articles.push(record);
            }
        }

        articles.truncate(self.max_articles);
        articles
    }

    fn record(&self, container: ElementRef<'_>) -> Option<ArticleRecord> {
        let anchor = first_match(container, &self.titles)?;
        let href = attr(anchor, "href")?;
        let link = self.base_url.join(href).ok()?;

        let title = clean_text(anchor);
        if title.is_empty() {
            return None;
        }

        let mut record = ArticleRecord::new(title, link.to_string());
        record.description = first_match(container, &self.descriptions)
            .map(clean_text)
            .unwrap_or_default();
        record.image_url = first_match(container, &self.images)
            .and_then(|img| {
                attr(img, "src").or_else(|| LAZY_IMAGE_ATTRS.iter().find_map(|a| attr(img, a)))
            })
            .and_then(|src| self.base_url.join(src).ok())
            .map(|u| u.to_string());

        Some(record)
    }
}
