use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Source of raw HTML documents.
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// HTTPS client for the target site. The site serves an invalid
/// certificate chain, so verification is off.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Starts a GET and hands back the response without buffering it, for
    /// byte pass-through. Non-success statuses are returned, not raised.
    pub async fn open(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        let mut req = self.client.get(url);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        req.send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}

#[async_trait]
impl HtmlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        debug!(%url, "fetching");
        let res = self.open(url, Some(timeout)).await?;

        if !res.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: res.status().as_u16(),
            });
        }

        res.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `reply` verbatim to every connection; `None` accepts and
    /// never answers.
    async fn upstream(reply: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    match reply {
                        Some(reply) => {
                            let _ = socket.write_all(reply.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                });
            }
        });
        format!("http://{addr}/")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("test-agent").unwrap()
    }

    #[tokio::test]
    async fn ok_reply_returns_body() {
        let url = upstream(Some(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 14\r\nconnection: close\r\n\r\n<p>listing</p>",
        ))
        .await;
        let html = fetcher().fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(html, "<p>listing</p>");
    }

    #[tokio::test]
    async fn silent_server_is_a_timeout() {
        let url = upstream(None).await;
        let err = fetcher().fetch(&url, Duration::from_millis(300)).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { url: ref u } if *u == url), "{err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let err = fetcher()
            .fetch("http://127.0.0.1:1/", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_code() {
        let url = upstream(Some(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 4\r\nconnection: close\r\n\r\nnope",
        ))
        .await;
        let err = fetcher().fetch(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }), "{err:?}");
    }
}
