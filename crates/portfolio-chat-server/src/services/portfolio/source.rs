use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::config::PortfolioConfig;
use crate::utils::error::FetchError;

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page unchanged since the presented validator.
    NotModified,
    Modified {
        body: String,
        validator: Option<String>,
    },
}

/// Remote portfolio document.
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, validator: Option<&str>) -> Result<FetchOutcome, FetchError>;
}

/// GET against a fixed URL with `If-None-Match` support.
#[derive(Clone)]
pub struct HttpDocumentSource {
    client: Client,
    url: String,
}

impl HttpDocumentSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, url: url.into() })
    }

    pub fn from_config(cfg: &PortfolioConfig) -> Result<Self, FetchError> {
        Self::new(cfg.url.clone(), cfg.fetch_timeout())
    }
}

#[async_trait::async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, validator: Option<&str>) -> Result<FetchOutcome, FetchError> {
        let mut request = self.client.get(&self.url);
        if let Some(tag) = validator.filter(|v| !v.is_empty()) {
            request = request.header(header::IF_NONE_MATCH, tag);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            debug!("Portfolio page not modified");
            return Ok(FetchOutcome::NotModified);
        }

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let validator = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());

        let body = response.text().await?;
        debug!("Fetched portfolio page ({} bytes, etag={:?})", body.len(), validator);

        Ok(FetchOutcome::Modified { body, validator })
    }
}
