use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::config::Settings;
use crate::error::FetchError;

/// Single GET with fixed headers. Implementations never retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, accept_language: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(accept_language)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(HttpFetcher { client })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.user_agent,
            &settings.accept_language,
            settings.timeout(),
        )
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::Url {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(parsed)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

/// In-memory fetcher keyed by url plus `page` parameter. Anything not
/// registered fails like a dropped connection.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    pages: std::collections::HashMap<String, String>,
}

#[cfg(any(test, feature = "testing"))]
impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the body returned for `url` at `page` (`None` = no `page` param).
    pub fn with_page(mut self, url: &str, page: Option<u32>, body: impl Into<String>) -> Self {
        self.pages.insert(Self::key(url, page), body.into());
        self
    }

    fn key(url: &str, page: Option<u32>) -> String {
        match page {
            Some(p) => format!("{url}#page={p}"),
            None => url.to_string(),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
        let page = query
            .iter()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok());
        self.pages
            .get(&Self::key(url, page))
            .cloned()
            .ok_or_else(|| FetchError::Missing(Self::key(url, page)))
    }
}
