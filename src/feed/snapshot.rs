//! HTTP helper for REST snapshot endpoints.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::Error;

/// Thin reqwest wrapper used by venue adapters to fetch snapshots.
///
/// Maps 5xx responses to [`Error::ExchangeNotAvailable`] and transport
/// failures to [`Error::Network`]. Does not retry; retry policy belongs to
/// the caller.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    client: Client,
}

impl SnapshotClient {
    /// Create a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET a JSON document from a snapshot endpoint
    pub async fn get_json(&self, url: &Url) -> Result<serde_json::Value, Error> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(Error::ExchangeNotAvailable {
                status: status.as_u16(),
            });
        }
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}
