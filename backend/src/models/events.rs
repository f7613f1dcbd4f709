use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every event emitted by the light curate registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    NewItem,
    RequestSubmitted,
    ItemStatusChange,
    Dispute,
    Evidence,
    MetaEvidence,
    Ruling,
    Contribution,
    ConnectedTCRSet,
    RewardWithdrawn,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::NewItem,
        EventKind::RequestSubmitted,
        EventKind::ItemStatusChange,
        EventKind::Dispute,
        EventKind::Evidence,
        EventKind::MetaEvidence,
        EventKind::Ruling,
        EventKind::Contribution,
        EventKind::ConnectedTCRSet,
        EventKind::RewardWithdrawn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NewItem => "NewItem",
            EventKind::RequestSubmitted => "RequestSubmitted",
            EventKind::ItemStatusChange => "ItemStatusChange",
            EventKind::Dispute => "Dispute",
            EventKind::Evidence => "Evidence",
            EventKind::MetaEvidence => "MetaEvidence",
            EventKind::Ruling => "Ruling",
            EventKind::Contribution => "Contribution",
            EventKind::ConnectedTCRSet => "ConnectedTCRSet",
            EventKind::RewardWithdrawn => "RewardWithdrawn",
        }
    }

    /// Submissions announce a new item or request to the channel.
    pub fn is_submission(&self) -> bool {
        matches!(self, EventKind::NewItem | EventKind::RequestSubmitted)
    }

    pub fn is_notifiable(&self) -> bool {
        self.is_submission() || *self == EventKind::Dispute
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded event argument, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Uint(U256),
    Word(B256),
    Address(Address),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Uint(value) => write!(f, "{value}"),
            ArgValue::Word(word) => write!(f, "0x{}", hex::encode(word)),
            ArgValue::Address(address) => f.write_str(&address.to_checksum(None)),
            ArgValue::Bool(flag) => write!(f, "{flag}"),
            ArgValue::Text(text) => f.write_str(text),
        }
    }
}

/// Event arguments in ABI declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventArgs(Vec<(String, ArgValue)>);

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.0.push((name.into(), value));
        self
    }

    /// Looks an argument up by name, ignoring case and leading underscores,
    /// so `_itemID`, `itemID` and `itemid` all match.
    pub fn find(&self, name: &str) -> Option<&ArgValue> {
        let wanted = arg_key(name);
        self.0
            .iter()
            .find(|(candidate, _)| arg_key(candidate) == wanted)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

fn arg_key(name: &str) -> String {
    name.trim_start_matches('_').to_ascii_lowercase()
}

/// Position of a log on chain.
///
/// Derived `Ord` is lexicographic over (block_number, transaction_index,
/// log_index), which is the canonical order every stage preserves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventPosition {
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
}

impl EventPosition {
    pub fn new(block_number: u64, transaction_index: u64, log_index: u64) -> Self {
        Self {
            block_number,
            transaction_index,
            log_index,
        }
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.block_number, self.transaction_index, self.log_index
        )
    }
}

/// A registry log decoded into a kind and its named arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub position: EventPosition,
    pub transaction_hash: B256,
    pub address: Address,
    pub args: EventArgs,
}

impl RawEvent {
    pub fn block_number(&self) -> u64 {
        self.position.block_number
    }

    pub fn tx_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.transaction_hash))
    }
}
