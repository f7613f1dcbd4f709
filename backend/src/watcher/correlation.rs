//! Links registry events that do not share an identifier.
//!
//! `NewItem` and `RequestSubmitted` carry the item id. `Dispute` only carries
//! an evidence group id, so the engine remembers which item each evidence
//! group (and each transaction) belongs to and resolves disputes through
//! those links. It also remembers which transactions already produced a
//! submission notification.

use crate::models::{ArgValue, EventKind, RawEvent};
use crate::store::CorrelationSnapshot;
use crate::utils::item_id::{extract_evidence_group, extract_item_id};
use alloy::primitives::B256;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CorrelationKey {
    Transaction(B256),
    EvidenceGroup(String),
}

#[derive(Debug, Clone)]
struct LinkedItem {
    item_id: String,
    block_number: u64,
}

#[derive(Debug, Clone)]
struct ContentRef {
    reference: String,
    block_number: u64,
}

/// What the engine decided about one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Kind that never produces a notification.
    Ignore,
    /// Submission from a transaction that was already notified.
    Duplicate,
    /// `NewItem` or `RequestSubmitted` to announce.
    Submission { item_id: Option<String> },
    /// `Dispute`; `item_id` is `None` when no link is known yet.
    Dispute {
        item_id: Option<String>,
        evidence_group: Option<String>,
    },
}

#[derive(Debug, Default)]
pub struct CorrelationEngine {
    items: HashMap<CorrelationKey, LinkedItem>,
    content_refs: HashMap<String, ContentRef>,
    /// tx hash -> block of the submission notified from it
    seen: HashMap<B256, u64>,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CorrelationSnapshot) -> Self {
        let mut engine = Self::new();
        for (group, item_id) in snapshot.evidence_groups {
            engine.link(CorrelationKey::EvidenceGroup(group), item_id, 0);
        }
        for (item_id, reference) in snapshot.content_refs {
            engine.content_refs.insert(item_id, ContentRef { reference, block_number: 0 });
        }
        engine
    }

    /// Records the links an event carries and classifies it.
    ///
    /// Links are recorded before the duplicate check so a deduplicated
    /// `RequestSubmitted` still registers its evidence group.
    pub fn observe(&mut self, event: &RawEvent) -> Verdict {
        let item_id = extract_item_id(&event.args);
        let evidence_group = extract_evidence_group(&event.args);
        let block_number = event.block_number();

        if let Some(item_id) = &item_id {
            if let Some(group) = &evidence_group {
                self.link(CorrelationKey::EvidenceGroup(group.clone()), item_id.clone(), block_number);
            }
            self.link(CorrelationKey::Transaction(event.transaction_hash), item_id.clone(), block_number);

            if event.kind == EventKind::NewItem {
                if let Some(ArgValue::Text(data)) = event.args.find("data") {
                    let data = data.trim();
                    if !data.is_empty() {
                        self.content_refs.insert(
                            item_id.clone(),
                            ContentRef {
                                reference: data.to_string(),
                                block_number,
                            },
                        );
                    }
                }
            }
        }

        if !event.kind.is_notifiable() {
            return Verdict::Ignore;
        }

        if event.kind.is_submission() {
            if self.is_seen(&event.transaction_hash) {
                return Verdict::Duplicate;
            }
            return Verdict::Submission { item_id };
        }

        let item_id = item_id.or_else(|| {
            evidence_group
                .as_ref()
                .and_then(|group| self.item_for(&CorrelationKey::EvidenceGroup(group.clone())))
                .or_else(|| self.item_for(&CorrelationKey::Transaction(event.transaction_hash)))
                .map(str::to_owned)
        });

        Verdict::Dispute {
            item_id,
            evidence_group,
        }
    }

    pub fn item_for(&self, key: &CorrelationKey) -> Option<&str> {
        self.items.get(key).map(|linked| linked.item_id.as_str())
    }

    /// Content reference from the item's `NewItem` data, if it was seen.
    pub fn content_ref(&self, item_id: &str) -> Option<&str> {
        self.content_refs.get(item_id).map(|content| content.reference.as_str())
    }

    /// Links an evidence group resolved outside the event stream.
    pub fn link_evidence_group(&mut self, group: &str, item_id: &str, block_number: u64) {
        self.link(
            CorrelationKey::EvidenceGroup(group.to_string()),
            item_id.to_string(),
            block_number,
        );
    }

    pub fn is_seen(&self, tx_hash: &B256) -> bool {
        self.seen.contains_key(tx_hash)
    }

    /// Marks the event's transaction as notified. Only submissions enter the
    /// seen set; a dispute never suppresses a later submission.
    pub fn mark_delivered(&mut self, event: &RawEvent) {
        if event.kind.is_submission() {
            self.seen.insert(event.transaction_hash, event.block_number());
        }
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Forgets delivered transactions and transaction links below
    /// `min_block`. Evidence group links are kept.
    pub fn evict_before(&mut self, min_block: u64) {
        self.seen.retain(|_, block| *block >= min_block);
        self.items.retain(|key, linked| {
            matches!(key, CorrelationKey::EvidenceGroup(_)) || linked.block_number >= min_block
        });
    }

    /// Keeps at most `max` evidence group links and `max` content references,
    /// dropping the ones recorded at the lowest blocks.
    pub fn cap_links(&mut self, max: usize) {
        let mut groups: Vec<(u64, CorrelationKey)> = self
            .items
            .iter()
            .filter(|(key, _)| matches!(key, CorrelationKey::EvidenceGroup(_)))
            .map(|(key, linked)| (linked.block_number, key.clone()))
            .collect();
        if groups.len() > max {
            let excess = groups.len() - max;
            groups.sort_by_key(|(block_number, _)| *block_number);
            for (_, key) in groups.drain(..excess) {
                self.items.remove(&key);
            }
        }

        let mut refs: Vec<(u64, String)> = self
            .content_refs
            .iter()
            .map(|(item_id, content)| (content.block_number, item_id.clone()))
            .collect();
        if refs.len() > max {
            let excess = refs.len() - max;
            refs.sort_by_key(|(block_number, _)| *block_number);
            for (_, item_id) in refs.drain(..excess) {
                self.content_refs.remove(&item_id);
            }
        }
    }

    pub fn snapshot(&self) -> CorrelationSnapshot {
        let evidence_groups = self
            .items
            .iter()
            .filter_map(|(key, linked)| match key {
                CorrelationKey::EvidenceGroup(group) => Some((group.clone(), linked.item_id.clone())),
                CorrelationKey::Transaction(_) => None,
            })
            .collect();

        CorrelationSnapshot {
            evidence_groups,
            content_refs: self
                .content_refs
                .iter()
                .map(|(item, content)| (item.clone(), content.reference.clone()))
                .collect(),
        }
    }

    fn link(&mut self, key: CorrelationKey, item_id: String, block_number: u64) {
        self.items.insert(key, LinkedItem { item_id, block_number });
    }
}
