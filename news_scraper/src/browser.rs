use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionMode;
use crate::error::RenderError;
use crate::render::{BrowserSession, PageHandle};

const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";
const READY_STATE_JS: &str = "document.readyState === 'complete'";

/// A started engine plus the task pumping its DevTools connection. The
/// task ending means the connection is gone.
struct Live<T> {
    inner: Arc<T>,
    handler: JoinHandle<()>,
}

enum State<T> {
    Idle,
    Running(Live<T>),
    Closed,
}

/// Start-on-first-use slot for the shared engine. A dead connection drops
/// the slot back to idle so the next caller starts a fresh one; `close` is
/// final.
struct Lifecycle<T> {
    state: Mutex<State<T>>,
}

impl<T> Lifecycle<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
        }
    }

    /// The running engine, started with `start` if there is none. The lock
    /// is only held while starting.
    async fn acquire<F, Fut>(&self, start: F) -> Result<Arc<T>, RenderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Live<T>, RenderError>>,
    {
        let mut state = self.state.lock().await;
        if matches!(&*state, State::Running(live) if live.handler.is_finished()) {
            warn!("browser connection lost, restarting");
            *state = State::Idle;
        }
        if let State::Idle = *state {
            *state = State::Running(start().await?);
        }
        match &*state {
            State::Running(live) => Ok(live.inner.clone()),
            _ => Err(RenderError::Session("browser session was shut down".into())),
        }
    }

    /// Forgets `stale` if it is still the current engine.
    async fn invalidate(&self, stale: &Arc<T>) {
        let mut state = self.state.lock().await;
        if matches!(&*state, State::Running(live) if Arc::ptr_eq(&live.inner, stale)) {
            if let State::Running(live) = std::mem::replace(&mut *state, State::Idle) {
                live.handler.abort();
            }
        }
    }

    async fn close(&self) -> Option<Live<T>> {
        match std::mem::replace(&mut *self.state.lock().await, State::Closed) {
            State::Running(live) => Some(live),
            _ => None,
        }
    }
}

/// Shared Chromium instance, started on first use and restarted if the
/// connection to it drops.
pub struct ChromiumSession {
    mode: SessionMode,
    lifecycle: Lifecycle<Browser>,
}

impl ChromiumSession {
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            lifecycle: Lifecycle::new(),
        }
    }

    async fn start(&self) -> Result<Live<Browser>, RenderError> {
        let (browser, mut handler) = match &self.mode {
            SessionMode::Local { executable } => {
                info!("launching headless browser");
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--ignore-certificate-errors")
                    .arg("--disable-dev-shm-usage")
                    .arg("--disable-gpu");
                if let Some(path) = executable {
                    builder = builder.chrome_executable(path);
                }
                let config = builder.build().map_err(RenderError::Session)?;
                Browser::launch(config)
                    .await
                    .map_err(|e| RenderError::Session(e.to_string()))?
            }
            SessionMode::Remote { ws_url } => {
                info!("connecting to remote browser");
                Browser::connect(ws_url.as_str())
                    .await
                    .map_err(|e| RenderError::Session(e.to_string()))?
            }
            SessionMode::Disabled => {
                return Err(RenderError::Session("browser rendering is disabled".into()))
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "devtools handler event error");
                }
            }
            debug!("devtools handler stopped");
        });
        info!("browser session ready");
        Ok(Live {
            inner: Arc::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, RenderError> {
        let browser = self.lifecycle.acquire(|| self.start()).await?;
        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Box::new(ChromiumPage { page })),
            Err(e) => {
                warn!(error = %e, "could not open a tab, dropping browser session");
                self.lifecycle.invalidate(&browser).await;
                Err(RenderError::Session(e.to_string()))
            }
        }
    }

    async fn warm_up(&self) -> Result<(), RenderError> {
        self.lifecycle.acquire(|| self.start()).await.map(drop)
    }

    async fn shutdown(&self) {
        let Some(Live { inner, handler }) = self.lifecycle.close().await else {
            return;
        };

        match self.mode {
            SessionMode::Remote { .. } => info!("disconnecting from remote browser"),
            _ => match Arc::try_unwrap(inner) {
                Ok(mut browser) => {
                    info!("closing browser");
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "browser did not close cleanly");
                    }
                    if let Err(e) = browser.wait().await {
                        warn!(error = %e, "waiting for browser exit failed");
                    }
                }
                Err(_) => warn!("pages still open at shutdown, dropping browser handle"),
            },
        }
        handler.abort();
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, js: &str) -> Result<T, RenderError> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| RenderError::Dom(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| RenderError::Dom(e.to_string()))
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), RenderError> {
        self.page
            .set_user_agent(user_agent)
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;
        Ok(())
    }

    /// `goto` returns on the load event; after that the resource count is
    /// sampled every `idle` until it stops growing.
    async fn navigate(&self, url: &str, idle: Duration) -> Result<(), RenderError> {
        self.page.goto(url).await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            msg: e.to_string(),
        })?;

        let mut last: Option<u64> = None;
        loop {
            tokio::time::sleep(idle).await;
            let count: u64 = self.eval(RESOURCE_COUNT_JS).await?;
            let ready: bool = self.eval(READY_STATE_JS).await?;
            if ready && last == Some(count) {
                return Ok(());
            }
            last = Some(count);
        }
    }

    async fn has_match(&self, selector: &str) -> Result<bool, RenderError> {
        let quoted = serde_json::to_string(selector).map_err(|e| RenderError::Dom(e.to_string()))?;
        self.eval(&format!("document.querySelector({quoted}) !== null")).await
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Dom(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.page
            .close()
            .await
            .map_err(|e| RenderError::Session(e.to_string()))
    }
}
