use crate::models::MarketDetails;
use alloy::primitives::Address;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Content-addressed document store (IPFS).
#[allow(async_fn_in_trait)]
pub trait ContentFetcher {
    /// Fetches a normalized reference as JSON; `None` on any failure.
    async fn fetch_json(&self, reference: &str) -> Option<Value>;
}

/// Indexing service queried when the event stream alone is not enough.
#[allow(async_fn_in_trait)]
pub trait IndexQuery {
    async fn market_for_item(&self, item_id: &str, registry: Address) -> Option<Address>;

    async fn item_for_evidence_group(&self, evidence_group: &str, registry: Address) -> Option<String>;
}

/// Resolves the Seer market behind a registry item.
///
/// The item document behind the content reference is tried first; the index
/// fills in the address when the document has none. Documents are cached per
/// reference for the life of the resolver.
pub struct MarketResolver<C, I> {
    content: C,
    index: I,
    cache: HashMap<String, MarketDetails>,
}

impl<C: ContentFetcher, I: IndexQuery> MarketResolver<C, I> {
    pub fn new(content: C, index: I) -> Self {
        Self {
            content,
            index,
            cache: HashMap::new(),
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub async fn resolve(&mut self, item_id: &str, content_ref: Option<&str>, registry: Address) -> MarketDetails {
        let mut details = match content_ref.and_then(normalize_content_ref) {
            Some(reference) => self.from_document(reference).await,
            None => MarketDetails::default(),
        };

        if details.address.is_none() {
            details.address = self.index.market_for_item(item_id, registry).await;
        }

        debug!("Resolved market for item {}: {:?}", item_id, details);
        details
    }

    async fn from_document(&mut self, reference: String) -> MarketDetails {
        if let Some(cached) = self.cache.get(&reference) {
            return cached.clone();
        }

        match self.content.fetch_json(&reference).await {
            Some(document) => {
                let details = details_from_document(&document);
                self.cache.insert(reference, details.clone());
                details
            }
            None => MarketDetails::default(),
        }
    }
}

/// Normalizes a content reference to a gateway path (`/ipfs/<cid>/...`).
///
/// Absolute http(s) URLs are returned unchanged. Anything unrecognized
/// yields `None`.
pub fn normalize_content_ref(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Some(trimmed.to_string());
    }
    if let Some(path) = trimmed.strip_prefix("ipfs://") {
        return Some(format!("/ipfs/{}", path.trim_start_matches("ipfs/")));
    }
    if trimmed.starts_with("/ipfs/") {
        return Some(trimmed.to_string());
    }
    if trimmed.starts_with("ipfs/") {
        return Some(format!("/{}", trimmed));
    }
    if trimmed.starts_with("Qm") || trimmed.starts_with("baf") {
        return Some(format!("/ipfs/{}", trimmed));
    }
    None
}

/// Reads a market address and display name out of a curate item document.
///
/// Item documents keep their fields under `values`; documents without it
/// are scanned at the top level.
pub fn details_from_document(document: &Value) -> MarketDetails {
    let Some(fields) = document
        .get("values")
        .and_then(Value::as_object)
        .or_else(|| document.as_object())
    else {
        return MarketDetails::default();
    };

    let mut details = MarketDetails::default();
    for (key, value) in fields {
        let Some(text) = value.as_str().map(str::trim).filter(|text| !text.is_empty()) else {
            continue;
        };
        let key = key.to_lowercase();
        let parsed_address = text.parse::<Address>().ok();

        if details.address.is_none() && (key.contains("market") || key.contains("address")) {
            if let Some(address) = parsed_address {
                details.address = Some(address);
                continue;
            }
        }

        if details.name.is_none()
            && parsed_address.is_none()
            && (key.contains("name") || key.contains("title") || key.contains("question"))
        {
            details.name = Some(text.to_string());
        }

        if details.is_complete() {
            break;
        }
    }
    details
}
