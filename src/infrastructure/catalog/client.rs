//! Remote overlay catalog HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::domain::entities::{OverlayModel, OverlayResponse};
use crate::domain::errors::CatalogError;
use crate::domain::ports::CatalogPort;

/// Path of the catalog document relative to the base URL.
pub const CATALOG_PATH: &str = "overlay.json";

/// Fetches the overlay list from `<base_url>/overlay.json`.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl CatalogClient {
    /// Creates client with custom base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::fetch_failed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            auth_token: None,
        })
    }

    /// Sends `token` as a bearer token with every request.
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Returns the full catalog URL.
    #[must_use]
    pub fn catalog_url(&self) -> String {
        format!("{}/{CATALOG_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CatalogPort for CatalogClient {
    async fn fetch_overlays(&self) -> Result<Vec<OverlayModel>, CatalogError> {
        let url = self.catalog_url();
        debug!(url = %url, "Fetching overlay catalog");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Failed to reach overlay catalog");
            if e.is_timeout() {
                CatalogError::fetch_failed("request timed out")
            } else if e.is_connect() {
                CatalogError::fetch_failed("failed to connect to catalog server")
            } else {
                CatalogError::fetch_failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::fetch_failed(format!("HTTP {status}")));
        }

        let overlays: OverlayResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse overlay catalog");
            CatalogError::fetch_failed(format!("failed to parse response: {e}"))
        })?;

        debug!(count = overlays.len(), "Fetched overlay catalog");
        Ok(overlays)
    }
}
