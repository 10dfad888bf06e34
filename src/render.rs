use std::future::Future;
use std::time::Duration;

use spider_client::shapes::request::{RequestType, ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;

use crate::error::FetchError;
use crate::net::{Fetch, HttpFetcher};

/// Opens a browsing session per source. The session is released when dropped,
/// so every exit path of a scrape gives it back.
pub trait Renderer: Send + Sync {
    type Session: RenderSession;

    fn open(&self) -> impl Future<Output = Result<Self::Session, FetchError>> + Send;
}

pub trait RenderSession: Send {
    /// Navigate to `url` and return the resulting markup.
    fn render(&mut self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

// ── spider.cloud (headless Chrome, scripts executed) ──

pub struct SpiderRenderer {
    api_key: String,
}

impl SpiderRenderer {
    pub fn new(api_key: String) -> Self {
        SpiderRenderer { api_key }
    }
}

pub struct SpiderSession {
    spider: Spider,
}

impl Renderer for SpiderRenderer {
    type Session = SpiderSession;

    async fn open(&self) -> Result<SpiderSession, FetchError> {
        let spider = Spider::new(Some(self.api_key.clone())).map_err(|e| FetchError::Render {
            url: "spider.cloud".to_string(),
            message: format!("failed to create Spider client: {}", e),
        })?;
        Ok(SpiderSession { spider })
    }
}

impl RenderSession for SpiderSession {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        let params = RequestParams {
            request: Some(RequestType::Chrome),
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| FetchError::Render {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };

        let first = parsed.as_array().and_then(|arr| arr.first());
        if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_u64()) {
            if !(200..300).contains(&status) {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status as u16,
                });
            }
        }

        first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| FetchError::Render {
                url: url.to_string(),
                message: "no content in spider response".to_string(),
            })
    }
}

// ── Plain HTTP (no script execution) ──

pub struct HttpRenderer {
    fetcher: HttpFetcher,
}

impl HttpRenderer {
    pub fn new(fetcher: HttpFetcher) -> Self {
        HttpRenderer { fetcher }
    }
}

impl Renderer for HttpRenderer {
    type Session = HttpRenderer;

    async fn open(&self) -> Result<HttpRenderer, FetchError> {
        Ok(HttpRenderer {
            fetcher: self.fetcher.clone(),
        })
    }
}

impl RenderSession for HttpRenderer {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        self.fetcher.get_text(url).await
    }
}

/// Either backend, picked from settings at startup.
pub enum AnyRenderer {
    Spider(SpiderRenderer),
    Http(HttpRenderer),
}

pub enum AnySession {
    Spider(SpiderSession),
    Http(HttpRenderer),
}

impl AnyRenderer {
    pub fn from_settings(api_key: Option<&str>, fetcher: HttpFetcher) -> Self {
        match api_key {
            Some(key) => AnyRenderer::Spider(SpiderRenderer::new(key.to_string())),
            None => {
                tracing::warn!("SPIDER_API_KEY not set; scraping without script execution");
                AnyRenderer::Http(HttpRenderer::new(fetcher))
            }
        }
    }
}

impl Renderer for AnyRenderer {
    type Session = AnySession;

    async fn open(&self) -> Result<AnySession, FetchError> {
        match self {
            AnyRenderer::Spider(r) => r.open().await.map(AnySession::Spider),
            AnyRenderer::Http(r) => r.open().await.map(AnySession::Http),
        }
    }
}

impl RenderSession for AnySession {
    async fn render(&mut self, url: &str) -> Result<String, FetchError> {
        match self {
            AnySession::Spider(s) => s.render(url).await,
            AnySession::Http(s) => s.render(url).await,
        }
    }
}

/// Render with a deadline; expiry becomes `FetchError::Timeout`.
pub async fn render_within<S: RenderSession>(
    session: &mut S,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    debug!(url, timeout_secs = timeout.as_secs(), "navigating");
    match tokio::time::timeout(timeout, session.render(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }),
    }
}
