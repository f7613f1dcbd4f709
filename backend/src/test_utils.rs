//! In-memory fakes and event builders shared by unit tests.

use crate::models::{ArgValue, EventArgs, EventKind, EventPosition, RawEvent};
use crate::watcher::collector::LogSource;
use crate::watcher::delivery::{DeliveryError, Notifier, SendOptions};
use crate::watcher::market::{ContentFetcher, IndexQuery};
use alloy::primitives::{Address, B256, U256};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

pub fn tx(n: u64) -> B256 {
    B256::left_padding_from(&n.to_be_bytes())
}

pub fn registry() -> Address {
    "0x5aaf9e23a11440f8c1ad6d2e2e5109c7e52cc672".parse().unwrap()
}

fn arbitrator() -> Address {
    "0x9c1da9a04925bdfdedf0f6421bc7eea8305f9002".parse().unwrap()
}

fn event(kind: EventKind, block: u64, tx_hash: B256, log_index: u64, args: EventArgs) -> RawEvent {
    RawEvent {
        kind,
        position: EventPosition::new(block, 0, log_index),
        transaction_hash: tx_hash,
        address: registry(),
        args,
    }
}

/// Event without arguments at an exact position, with a transaction hash
/// unique to that position.
pub fn event_at(kind: EventKind, block: u64, transaction_index: u64, log_index: u64) -> RawEvent {
    RawEvent {
        kind,
        position: EventPosition::new(block, transaction_index, log_index),
        transaction_hash: tx(block * 1_000_000 + transaction_index * 1_000 + log_index),
        address: registry(),
        args: EventArgs::new(),
    }
}

pub fn new_item(block: u64, tx_hash: B256, item: u64, data: &str) -> RawEvent {
    let args = EventArgs::new()
        .with("_itemID", ArgValue::Uint(U256::from(item)))
        .with("_data", ArgValue::Text(data.to_string()))
        .with("_addedDirectly", ArgValue::Bool(false));
    event(EventKind::NewItem, block, tx_hash, 0, args)
}

pub fn request_submitted(block: u64, tx_hash: B256, item: u64, evidence_group: u64) -> RawEvent {
    let args = EventArgs::new()
        .with("_itemID", ArgValue::Uint(U256::from(item)))
        .with("_evidenceGroupID", ArgValue::Uint(U256::from(evidence_group)));
    event(EventKind::RequestSubmitted, block, tx_hash, 1, args)
}

pub fn dispute(block: u64, tx_hash: B256, dispute_id: u64, evidence_group: u64) -> RawEvent {
    let args = EventArgs::new()
        .with("_arbitrator", ArgValue::Address(arbitrator()))
        .with("_disputeID", ArgValue::Uint(U256::from(dispute_id)))
        .with("_metaEvidenceID", ArgValue::Uint(U256::from(1u64)))
        .with("_evidenceGroupID", ArgValue::Uint(U256::from(evidence_group)));
    event(EventKind::Dispute, block, tx_hash, 2, args)
}

/// Log source over a fixed list of events.
pub struct FakeLogSource {
    head: u64,
    events: Vec<RawEvent>,
    failing: HashSet<EventKind>,
    head_fails: Cell<bool>,
}

impl FakeLogSource {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            events: Vec::new(),
            failing: HashSet::new(),
            head_fails: Cell::new(false),
        }
    }

    pub fn with_event(mut self, event: RawEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn failing(mut self, kind: EventKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn fail_head(&self, fails: bool) {
        self.head_fails.set(fails);
    }
}

impl LogSource for FakeLogSource {
    async fn head_block(&self) -> Result<u64> {
        if self.head_fails.get() {
            return Err(anyhow!("head unavailable"));
        }
        Ok(self.head)
    }

    async fn fetch_logs(&self, kind: EventKind, range: RangeInclusive<u64>) -> Result<Vec<RawEvent>> {
        if self.failing.contains(&kind) {
            return Err(anyhow!("{} logs unavailable", kind));
        }
        Ok(self
            .events
            .iter()
            .filter(|event| event.kind == kind && range.contains(&event.block_number()))
            .cloned()
            .collect())
    }
}

/// Notifier that records every attempt and can simulate API errors per chat.
#[derive(Default)]
pub struct RecordingNotifier {
    migrations: HashMap<String, i64>,
    rate_limits: HashMap<String, u64>,
    sent: RefCell<Vec<(String, String)>>,
    attempts: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn migrating(mut self, chat_id: &str, new_chat_id: i64) -> Self {
        self.migrations.insert(chat_id.to_string(), new_chat_id);
        self
    }

    pub fn rate_limited(mut self, chat_id: &str, retry_after: u64) -> Self {
        self.rate_limits.insert(chat_id.to_string(), retry_after);
        self
    }

    /// Successful sends as (chat, text).
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }

    /// Every chat a send was attempted to, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn send_message(&self, chat_id: &str, text: &str, _options: &SendOptions) -> Result<(), DeliveryError> {
        self.attempts.borrow_mut().push(chat_id.to_string());

        if let Some(&new_chat_id) = self.migrations.get(chat_id) {
            return Err(DeliveryError::Api {
                status: 400,
                description: "Bad Request: group chat was upgraded to a supergroup chat".to_string(),
                migrate_to_chat_id: Some(new_chat_id),
                retry_after: None,
            });
        }
        if let Some(&retry_after) = self.rate_limits.get(chat_id) {
            return Err(DeliveryError::Api {
                status: 429,
                description: "Too Many Requests".to_string(),
                migrate_to_chat_id: None,
                retry_after: Some(retry_after),
            });
        }

        self.sent.borrow_mut().push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Content store over a fixed reference -> document map.
#[derive(Default)]
pub struct StaticContent {
    documents: HashMap<String, Value>,
    calls: Cell<usize>,
}

impl StaticContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, document: Value) -> Self {
        self.documents.insert(reference.to_string(), document);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ContentFetcher for StaticContent {
    async fn fetch_json(&self, reference: &str) -> Option<Value> {
        self.calls.set(self.calls.get() + 1);
        self.documents.get(reference).cloned()
    }
}

#[derive(Default)]
pub struct StaticIndex {
    markets: HashMap<String, Address>,
    evidence_groups: HashMap<String, String>,
    market_calls: Cell<usize>,
}

impl StaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(mut self, item_id: &str, market: Address) -> Self {
        self.markets.insert(item_id.to_string(), market);
        self
    }

    pub fn with_evidence_group(mut self, evidence_group: &str, item_id: &str) -> Self {
        self.evidence_groups.insert(evidence_group.to_string(), item_id.to_string());
        self
    }

    pub fn market_calls(&self) -> usize {
        self.market_calls.get()
    }
}

impl IndexQuery for StaticIndex {
    async fn market_for_item(&self, item_id: &str, _registry: Address) -> Option<Address> {
        self.market_calls.set(self.market_calls.get() + 1);
        self.markets.get(item_id).copied()
    }

    async fn item_for_evidence_group(&self, evidence_group: &str, _registry: Address) -> Option<String> {
        self.evidence_groups.get(evidence_group).cloned()
    }
}
