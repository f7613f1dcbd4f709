use crate::store::CursorStore;
use tracing::info;

/// Highest block considered final: `head - confirmations`, floored at zero.
pub fn confirmed_target(head: u64, confirmations: u64) -> u64 {
    head.saturating_sub(confirmations)
}

/// Cursor to resume from at startup.
///
/// A configured start block wins over the persisted cursor and makes
/// processing begin at that block. Without one, the persisted cursor is used,
/// or `target` when nothing was persisted so a fresh install only watches new
/// blocks.
pub fn initial_cursor(start_block: Option<u64>, store: &CursorStore, target: u64) -> Option<u64> {
    if let Some(start) = start_block {
        info!("Starting from configured block {}", start);
        return start.checked_sub(1);
    }

    let cursor = store.load(Some(target));
    info!("Resuming from block {:?}", cursor);
    cursor
}

/// First block not yet processed.
pub fn next_block(cursor: Option<u64>) -> u64 {
    cursor.map_or(0, |block| block.saturating_add(1))
}

pub fn is_caught_up(cursor: Option<u64>, target: u64) -> bool {
    cursor.is_some_and(|block| block >= target)
}
