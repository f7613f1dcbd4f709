use crate::constants::RPC_REQUEST_TIMEOUT_SECS;
use crate::models::{ArgValue, EventArgs, EventKind, EventPosition, RawEvent};
use crate::watcher::collector::LogSource;
use alloy::{
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use anyhow::{anyhow, Context, Result};
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::warn;

// Event interface of the light curate registry
mod abi {
    alloy::sol! {
        event NewItem(bytes32 indexed _itemID, string _data, bool _addedDirectly);
        event RequestSubmitted(bytes32 indexed _itemID, uint256 _evidenceGroupID);
        event ItemStatusChange(bytes32 indexed _itemID, bool _updatedDirectly);
        event Dispute(address indexed _arbitrator, uint256 indexed _disputeID, uint256 _metaEvidenceID, uint256 _evidenceGroupID);
        event Evidence(address indexed _arbitrator, uint256 indexed _evidenceGroupID, address indexed _party, string _evidence);
        event MetaEvidence(uint256 indexed _metaEvidenceID, string _evidence);
        event Ruling(address indexed _arbitrator, uint256 indexed _disputeID, uint256 _ruling);
        event Contribution(bytes32 indexed _itemID, uint256 _requestID, uint256 _roundID, address indexed _contributor, uint256 _contribution, uint8 _side);
        event ConnectedTCRSet(address indexed _connectedTCR);
        event RewardWithdrawn(address indexed _beneficiary, bytes32 indexed _itemID, uint256 _request, uint256 _round, uint256 _reward);
    }
}

/// Reads registry logs over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RegistryLogSource<P> {
    provider: P,
    registry: Address,
    timeout: Duration,
}

impl<P: Provider> RegistryLogSource<P> {
    pub fn new(provider: P, registry: Address) -> Self {
        Self {
            provider,
            registry,
            timeout: Duration::from_secs(RPC_REQUEST_TIMEOUT_SECS),
        }
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id = tokio::time::timeout(self.timeout, self.provider.get_chain_id())
            .await
            .context("chain id request timed out")??;
        Ok(chain_id)
    }
}

/// Creates an HTTP provider for `rpc_url` watching `registry`.
pub fn connect_http(rpc_url: &str, registry: Address) -> Result<RegistryLogSource<impl Provider + use<>>> {
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);
    Ok(RegistryLogSource::new(provider, registry))
}

impl<P: Provider> LogSource for RegistryLogSource<P> {
    async fn head_block(&self) -> Result<u64> {
        let block = tokio::time::timeout(self.timeout, self.provider.get_block_number())
            .await
            .context("block number request timed out")??;
        Ok(block)
    }

    async fn fetch_logs(&self, kind: EventKind, range: RangeInclusive<u64>) -> Result<Vec<RawEvent>> {
        let filter = Filter::new()
            .address(self.registry)
            .event_signature(event_topic(kind))
            .from_block(*range.start())
            .to_block(*range.end());

        let logs = tokio::time::timeout(self.timeout, self.provider.get_logs(&filter))
            .await
            .with_context(|| format!("{} log request timed out", kind))??;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match decode_log(kind, log) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    "Skipping undecodable {} log in tx {}: {:#}",
                    kind,
                    log.transaction_hash.unwrap_or_default(),
                    e
                ),
            }
        }
        Ok(events)
    }
}

/// Topic0 of each registry event.
pub fn event_topic(kind: EventKind) -> B256 {
    match kind {
        EventKind::NewItem => abi::NewItem::SIGNATURE_HASH,
        EventKind::RequestSubmitted => abi::RequestSubmitted::SIGNATURE_HASH,
        EventKind::ItemStatusChange => abi::ItemStatusChange::SIGNATURE_HASH,
        EventKind::Dispute => abi::Dispute::SIGNATURE_HASH,
        EventKind::Evidence => abi::Evidence::SIGNATURE_HASH,
        EventKind::MetaEvidence => abi::MetaEvidence::SIGNATURE_HASH,
        EventKind::Ruling => abi::Ruling::SIGNATURE_HASH,
        EventKind::Contribution => abi::Contribution::SIGNATURE_HASH,
        EventKind::ConnectedTCRSet => abi::ConnectedTCRSet::SIGNATURE_HASH,
        EventKind::RewardWithdrawn => abi::RewardWithdrawn::SIGNATURE_HASH,
    }
}

/// Decodes a log fetched for `kind` into a [`RawEvent`], keeping argument
/// names as declared by the contract.
pub fn decode_log(kind: EventKind, log: &Log) -> Result<RawEvent> {
    match kind {
        EventKind::NewItem => decode::<abi::NewItem>(kind, log, |e| {
            EventArgs::new()
                .with("_itemID", ArgValue::Word(e._itemID))
                .with("_data", ArgValue::Text(e._data))
                .with("_addedDirectly", ArgValue::Bool(e._addedDirectly))
        }),
        EventKind::RequestSubmitted => decode::<abi::RequestSubmitted>(kind, log, |e| {
            EventArgs::new()
                .with("_itemID", ArgValue::Word(e._itemID))
                .with("_evidenceGroupID", ArgValue::Uint(e._evidenceGroupID))
        }),
        EventKind::ItemStatusChange => decode::<abi::ItemStatusChange>(kind, log, |e| {
            EventArgs::new()
                .with("_itemID", ArgValue::Word(e._itemID))
                .with("_updatedDirectly", ArgValue::Bool(e._updatedDirectly))
        }),
        EventKind::Dispute => decode::<abi::Dispute>(kind, log, |e| {
            EventArgs::new()
                .with("_arbitrator", ArgValue::Address(e._arbitrator))
                .with("_disputeID", ArgValue::Uint(e._disputeID))
                .with("_metaEvidenceID", ArgValue::Uint(e._metaEvidenceID))
                .with("_evidenceGroupID", ArgValue::Uint(e._evidenceGroupID))
        }),
        EventKind::Evidence => decode::<abi::Evidence>(kind, log, |e| {
            EventArgs::new()
                .with("_arbitrator", ArgValue::Address(e._arbitrator))
                .with("_evidenceGroupID", ArgValue::Uint(e._evidenceGroupID))
                .with("_party", ArgValue::Address(e._party))
                .with("_evidence", ArgValue::Text(e._evidence))
        }),
        EventKind::MetaEvidence => decode::<abi::MetaEvidence>(kind, log, |e| {
            EventArgs::new()
                .with("_metaEvidenceID", ArgValue::Uint(e._metaEvidenceID))
                .with("_evidence", ArgValue::Text(e._evidence))
        }),
        EventKind::Ruling => decode::<abi::Ruling>(kind, log, |e| {
            EventArgs::new()
                .with("_arbitrator", ArgValue::Address(e._arbitrator))
                .with("_disputeID", ArgValue::Uint(e._disputeID))
                .with("_ruling", ArgValue::Uint(e._ruling))
        }),
        EventKind::Contribution => decode::<abi::Contribution>(kind, log, |e| {
            EventArgs::new()
                .with("_itemID", ArgValue::Word(e._itemID))
                .with("_requestID", ArgValue::Uint(e._requestID))
                .with("_roundID", ArgValue::Uint(e._roundID))
                .with("_contributor", ArgValue::Address(e._contributor))
                .with("_contribution", ArgValue::Uint(e._contribution))
                .with("_side", ArgValue::Uint(U256::from(e._side)))
        }),
        EventKind::ConnectedTCRSet => decode::<abi::ConnectedTCRSet>(kind, log, |e| {
            EventArgs::new().with("_connectedTCR", ArgValue::Address(e._connectedTCR))
        }),
        EventKind::RewardWithdrawn => decode::<abi::RewardWithdrawn>(kind, log, |e| {
            EventArgs::new()
                .with("_beneficiary", ArgValue::Address(e._beneficiary))
                .with("_itemID", ArgValue::Word(e._itemID))
                .with("_request", ArgValue::Uint(e._request))
                .with("_round", ArgValue::Uint(e._round))
                .with("_reward", ArgValue::Uint(e._reward))
        }),
    }
}

fn decode<E: SolEvent>(kind: EventKind, log: &Log, args: impl FnOnce(E) -> EventArgs) -> Result<RawEvent> {
    let (Some(block_number), Some(transaction_index), Some(log_index), Some(transaction_hash)) = (
        log.block_number,
        log.transaction_index,
        log.log_index,
        log.transaction_hash,
    ) else {
        return Err(anyhow!("{} log is missing its chain position", kind));
    };
    let decoded = log.log_decode::<E>()?;

    Ok(RawEvent {
        kind,
        position: EventPosition::new(block_number, transaction_index, log_index),
        transaction_hash,
        address: log.address(),
        args: args(decoded.inner.data),
    })
}
