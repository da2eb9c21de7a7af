//! Listing extraction through a real browser.
//!
//! The site inserts most of its article modules with JavaScript, so the
//! static HTML often has no containers at all. A page is opened on the
//! shared session, loaded until the network quiets down, and once one of
//! the landmark selectors shows up the live DOM is serialized and run
//! through the same [`ListingExtractor`] as the static path.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, instrument, warn};

use crate::error::RenderError;
use crate::extract::{ListingExtractor, LANDMARK_SELECTOR};
use crate::ArticleRecord;

const LANDMARK_POLL: Duration = Duration::from_millis(250);

/// Process-wide handle to a rendering engine.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a fresh tab. The caller owns it and must close it.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, RenderError>;

    /// Starts the engine ahead of the first request.
    async fn warm_up(&self) -> Result<(), RenderError>;

    /// Releases the engine. Called once, at process exit.
    async fn shutdown(&self);
}

/// A single browser tab.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError>;

    /// Loads `url` and returns once network activity has settled for
    /// `idle`. Has no deadline of its own.
    async fn navigate(&self, url: &str, idle: Duration) -> Result<(), RenderError>;

    /// Whether anything in the live DOM matches the CSS selector.
    async fn has_match(&self, selector: &str) -> Result<bool, RenderError>;

    /// Serialized live DOM.
    async fn content(&self) -> Result<String, RenderError>;

    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

#[derive(Debug, Clone)]
pub struct RenderTimeouts {
    pub navigation: Duration,
    pub network_idle: Duration,
    pub landmarks: Duration,
}

pub struct RenderingExtractor {
    session: Arc<dyn BrowserSession>,
    extractor: Arc<ListingExtractor>,
    user_agent: String,
    timeouts: RenderTimeouts,
}

impl RenderingExtractor {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        extractor: Arc<ListingExtractor>,
        user_agent: String,
        timeouts: RenderTimeouts,
    ) -> Self {
        Self {
            session,
            extractor,
            user_agent,
            timeouts,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> Result<Vec<ArticleRecord>, RenderError> {
        let page = self.session.new_page().await?;

        let result = self.extract_on(page.as_ref(), url).await;

        if let Err(e) = page.close().await {
            warn!(%url, error = %e, "failed to close page");
        }
        result
    }

    async fn extract_on(&self, page: &dyn PageHandle, url: &str) -> Result<Vec<ArticleRecord>, RenderError> {
        page.set_user_agent(&self.user_agent).await?;

        timeout(
            self.timeouts.navigation,
            page.navigate(url, self.timeouts.network_idle),
        )
        .await
        .map_err(|_| RenderError::NavigationTimeout { url: url.to_string() })??;

        self.wait_for_landmarks(page, url).await?;

        let html = page.content().await?;
        let articles = self.extractor.extract(&html);
        debug!(%url, count = articles.len(), "extracted from rendered dom");
        Ok(articles)
    }

    async fn wait_for_landmarks(&self, page: &dyn PageHandle, url: &str) -> Result<(), RenderError> {
        let deadline = Instant::now() + self.timeouts.landmarks;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, page.has_match(LANDMARK_SELECTOR)).await {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => break,
            }
            if Instant::now() + LANDMARK_POLL > deadline {
                break;
            }
            sleep(LANDMARK_POLL).await;
        }
        Err(RenderError::LandmarkTimeout { url: url.to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use url::Url;

    /// Scripted page: what navigation does, whether landmarks appear,
    /// and what the DOM serializes to.
    #[derive(Clone)]
    pub(crate) struct Script {
        pub nav_fails: bool,
        pub nav_hangs: bool,
        pub landmarks_after: Option<usize>,
        pub html: String,
    }

    impl Script {
        pub(crate) fn ok(html: &str) -> Self {
            Self {
                nav_fails: false,
                nav_hangs: false,
                landmarks_after: Some(0),
                html: html.to_string(),
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct Counters {
        pub opened: AtomicUsize,
        pub closed: AtomicUsize,
        pub user_agent: Mutex<Option<String>>,
        pub shut_down: AtomicBool,
    }

    pub(crate) struct FakeSession {
        pub script: Script,
        pub counters: Arc<Counters>,
    }

    impl FakeSession {
        pub(crate) fn new(script: Script) -> Self {
            Self {
                script,
                counters: Arc::new(Counters::default()),
            }
        }
    }

    struct FakePage {
        script: Script,
        counters: Arc<Counters>,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn new_page(&self) -> Result<Box<dyn PageHandle>, RenderError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePage {
                script: self.script.clone(),
                counters: self.counters.clone(),
                polls: AtomicUsize::new(0),
            }))
        }

        async fn warm_up(&self) -> Result<(), RenderError> {
            Ok(())
        }

        async fn shutdown(&self) {
            self.counters.shut_down.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PageHandle for FakePage {
        async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError> {
            *self.counters.user_agent.lock().unwrap() = Some(user_agent.to_string());
            Ok(())
        }

        async fn navigate(&self, url: &str, _idle: Duration) -> Result<(), RenderError> {
            if self.script.nav_hangs {
                std::future::pending::<()>().await;
            }
            if self.script.nav_fails {
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    msg: "net::ERR_CONNECTION_RESET".into(),
                });
            }
            Ok(())
        }

        async fn has_match(&self, _selector: &str) -> Result<bool, RenderError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.script.landmarks_after.is_some_and(|after| n >= after))
        }

        async fn content(&self) -> Result<String, RenderError> {
            Ok(self.script.html.clone())
        }

        async fn close(self: Box<Self>) -> Result<(), RenderError> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn extractor_for(session: Arc<FakeSession>) -> RenderingExtractor {
        RenderingExtractor::new(
            session,
            Arc::new(ListingExtractor::new(Url::parse("https://site.test/").unwrap(), 30)),
            "test-agent".into(),
            RenderTimeouts {
                navigation: Duration::from_secs(30),
                network_idle: Duration::from_millis(500),
                landmarks: Duration::from_secs(10),
            },
        )
    }

    const LISTING: &str = r#"<div class="td-module-container">
        <img src="/t.jpg"><h3 class="entry-title"><a href="/a/">A</a></h3></div>"#;

    #[tokio::test]
    async fn renders_and_closes_page() {
        let session = Arc::new(FakeSession::new(Script::ok(LISTING)));
        let articles = extractor_for(session.clone()).extract("https://site.test/").await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://site.test/a/");
        assert_eq!(session.counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(session.counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(session.counters.user_agent.lock().unwrap().as_deref(), Some("test-agent"));
        assert!(!session.counters.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn landmarks_that_show_up_late_are_awaited() {
        let mut script = Script::ok(LISTING);
        script.landmarks_after = Some(3);
        let session = Arc::new(FakeSession::new(script));

        let articles = extractor_for(session).extract("https://site.test/").await.unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_landmarks_is_an_error_and_page_is_closed() {
        let mut script = Script::ok(LISTING);
        script.landmarks_after = None;
        let session = Arc::new(FakeSession::new(script));

        let err = extractor_for(session.clone()).extract("https://site.test/").await.unwrap_err();
        assert!(matches!(err, RenderError::LandmarkTimeout { .. }));
        assert_eq!(session.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_error_closes_page() {
        let mut script = Script::ok(LISTING);
        script.nav_fails = true;
        let session = Arc::new(FakeSession::new(script));

        let err = extractor_for(session.clone()).extract("https://site.test/").await.unwrap_err();
        assert!(matches!(err, RenderError::Navigation { .. }));
        assert_eq!(session.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_navigation_times_out() {
        let mut script = Script::ok(LISTING);
        script.nav_hangs = true;
        let session = Arc::new(FakeSession::new(script));

        let err = extractor_for(session.clone()).extract("https://site.test/").await.unwrap_err();
        assert!(matches!(err, RenderError::NavigationTimeout { .. }));
        assert_eq!(session.counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rendered_page_without_articles_is_empty_not_error() {
        let session = Arc::new(FakeSession::new(Script::ok("<article><p>intro</p></article>")));
        let articles = extractor_for(session).extract("https://site.test/").await.unwrap();
        assert!(articles.is_empty());
    }
}
