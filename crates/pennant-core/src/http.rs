// reqwest-backed fetch session.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::fetch::{FetchError, PageFetcher, Session};
use crate::table::{self, Table};

const DEFAULT_USER_AGENT: &str = concat!("pennant/", env!("CARGO_PKG_VERSION"));

/// Transport settings for an `HttpSession`.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// One HTTP client shared by every request of a run.
pub struct HttpSession {
    client: Option<reqwest::Client>,
}

impl HttpSession {
    pub fn open(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| FetchError::Open(e.to_string()))?;
        info!(
            user_agent = %settings.user_agent,
            timeout_secs = settings.timeout.as_secs(),
            "HTTP session opened"
        );
        Ok(Self {
            client: Some(client),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let client = self.client.as_ref().ok_or(FetchError::Closed)?;
        let response = client.get(url).send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;
        debug!(url, bytes = body.len(), "page downloaded");
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpSession {
    async fn fetch_tables(&self, url: &str) -> Result<Vec<Table>, FetchError> {
        let body = self.get_text(url).await?;
        table::parse_tables(&body).map_err(|e| FetchError::Table {
            url: url.to_string(),
            source: e,
        })
    }

    /// The site renders some tables by un-commenting them client side;
    /// stripping the comment markers yields the same document.
    async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError> {
        let body = self.get_text(url).await?;
        Ok(table::strip_comment_markers(&body))
    }
}

impl Session for HttpSession {
    fn close(&mut self) {
        if self.client.take().is_some() {
            info!("HTTP session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_session_refuses_requests() {
        let mut session = HttpSession::open(&HttpSettings::default()).unwrap();
        session.close();
        let err = session.fetch_tables("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, FetchError::Closed));
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(HttpSettings::default().user_agent.starts_with("pennant/"));
    }
}
