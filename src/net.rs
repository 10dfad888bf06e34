use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Plain text GET. Implemented over HTTP in production and by maps in tests.
pub trait Fetch: Send + Sync {
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// `reqwest` client with a browser-like user agent and a hard timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(HttpFetcher { client, timeout })
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        HttpFetcher {
            client: self.client.clone(),
            timeout,
        }
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Http(e)
        }
    }
}

impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| self.classify(url, e))
    }
}
