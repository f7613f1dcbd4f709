use crate::constants::LOOKUP_TIMEOUT_SECS;
use crate::watcher::market::IndexQuery;
use alloy::primitives::Address;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const ITEM_PROPS_QUERY: &str = r#"
query ItemProps($itemID: String!, $registry: String!) {
  litems(where: { itemID: $itemID, registryAddress: $registry }, first: 1) {
    props { label type value }
  }
}"#;

const EVIDENCE_GROUP_QUERY: &str = r#"
query EvidenceGroupItem($evidenceGroupID: String!, $registry: String!) {
  lrequests(where: { evidenceGroupID: $evidenceGroupID, registryAddress: $registry }, first: 1) {
    item { itemID }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ItemProp {
    #[serde(default)]
    label: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

/// Curate subgraph lookups. Without a URL every lookup returns `None`.
#[derive(Clone)]
pub struct CurateSubgraph {
    http: Client,
    url: Option<String>,
}

impl CurateSubgraph {
    pub fn new(url: Option<String>) -> Self {
        Self {
            http: Client::new(),
            url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn query(&self, query: &str, variables: Value) -> Option<Value> {
        let url = self.url.as_deref()?;

        let response = match self
            .http
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .timeout(Duration::from_secs(LOOKUP_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Subgraph returned status {}", response.status());
                return None;
            }
            Err(e) => {
                warn!("Subgraph request failed: {}", e);
                return None;
            }
        };

        let parsed: GraphResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Subgraph response is not valid JSON: {}", e);
                return None;
            }
        };

        if let Some(errors) = parsed.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            warn!("Subgraph query failed: {}", messages.join("; "));
            return None;
        }
        parsed.data
    }
}

impl IndexQuery for CurateSubgraph {
    async fn market_for_item(&self, item_id: &str, registry: Address) -> Option<Address> {
        let variables = json!({ "itemID": item_id, "registry": registry_key(registry) });
        let data = self.query(ITEM_PROPS_QUERY, variables).await?;
        let market = market_from_props(&data);
        debug!("Subgraph market for item {}: {:?}", item_id, market);
        market
    }

    async fn item_for_evidence_group(&self, evidence_group: &str, registry: Address) -> Option<String> {
        let variables = json!({ "evidenceGroupID": evidence_group, "registry": registry_key(registry) });
        let data = self.query(EVIDENCE_GROUP_QUERY, variables).await?;
        let item = item_from_requests(&data);
        debug!("Subgraph item for evidence group {}: {:?}", evidence_group, item);
        item
    }
}

fn registry_key(registry: Address) -> String {
    format!("0x{}", hex::encode(registry))
}

/// First address-typed (or market-labelled) prop of the first item.
fn market_from_props(data: &Value) -> Option<Address> {
    let props = data.pointer("/litems/0/props")?.clone();
    let props: Vec<ItemProp> = serde_json::from_value(props).ok()?;

    props.iter().find_map(|prop| {
        let is_address = prop.kind.as_deref() == Some("address")
            || prop.label.to_lowercase().contains("market");
        if !is_address {
            return None;
        }
        prop.value.as_deref()?.trim().parse::<Address>().ok()
    })
}

fn item_from_requests(data: &Value) -> Option<String> {
    data.pointer("/lrequests/0/item/itemID")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .filter(|item| !item.is_empty())
}
