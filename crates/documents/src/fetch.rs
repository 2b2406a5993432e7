//! Retrieval of stored artifacts by URL.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Default timeout for a single download.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Plain HTTP(S) GET.
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetch for HttpFetch {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::ForeignUrl(url.to_string()));
        }
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
