use crate::constants::LOOKUP_TIMEOUT_SECS;
use crate::watcher::market::ContentFetcher;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches registry item documents through an HTTP IPFS gateway.
#[derive(Clone)]
pub struct IpfsGateway {
    http: Client,
    base_url: String,
}

impl IpfsGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Full URL for a normalized reference; absolute URLs pass through.
    pub fn url_for(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            reference.trim_start_matches('/')
        )
    }
}

impl ContentFetcher for IpfsGateway {
    async fn fetch_json(&self, reference: &str) -> Option<Value> {
        let url = self.url_for(reference);
        debug!("Fetching item document {}", url);

        let response = match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Gateway returned status {} for {}", response.status(), url);
            return None;
        }

        match response.json::<Value>().await {
            Ok(document) => Some(document),
            Err(e) => {
                warn!("Item document at {} is not JSON: {}", url, e);
                None
            }
        }
    }
}
