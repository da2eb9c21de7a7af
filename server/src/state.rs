use news_scraper::fetcher::HttpFetcher;
use news_scraper::NewsService;
use std::sync::Arc;

// Shared by every handler: the listing service (cache + browser session)
// and the client used for image pass-through.
#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsService>,
    pub images: HttpFetcher,
}

impl AppState {
    pub fn new(news: Arc<NewsService>, images: HttpFetcher) -> Self {
        AppState { news, images }
    }
}
