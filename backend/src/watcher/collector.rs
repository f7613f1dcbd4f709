use crate::models::{EventKind, RawEvent};
use anyhow::Result;
use std::ops::RangeInclusive;
use tracing::{error, info};

/// Source of registry logs and chain height.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    async fn head_block(&self) -> Result<u64>;

    async fn fetch_logs(&self, kind: EventKind, range: RangeInclusive<u64>) -> Result<Vec<RawEvent>>;
}

/// Fetches every watched kind over `range` and merges the results in
/// canonical (block, transaction index, log index) order.
///
/// A failed fetch for one kind is logged and skipped; the other kinds are
/// still collected.
pub async fn collect_events<S: LogSource>(
    source: &S,
    kinds: &[EventKind],
    range: RangeInclusive<u64>,
) -> Vec<RawEvent> {
    let mut collected = Vec::new();

    for &kind in kinds {
        match source.fetch_logs(kind, range.clone()).await {
            Ok(mut logs) => collected.append(&mut logs),
            Err(e) => {
                error!(
                    "Failed to fetch {} events in blocks {} to {}: {:#}",
                    kind,
                    range.start(),
                    range.end(),
                    e
                );
            }
        }
    }

    collected.sort_by_key(|event| event.position);

    if !collected.is_empty() {
        info!(
            "🔍 Found {} events in blocks {} to {}",
            collected.len(),
            range.start(),
            range.end()
        );
    }
    collected
}
