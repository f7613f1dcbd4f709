use crate::constants::MAX_CORRELATION_LINKS;
use crate::models::EventKind;
use crate::store::CursorStore;
use crate::watcher::batches::BatchPlanner;
use crate::watcher::collector::{collect_events, LogSource};
use crate::watcher::delivery::Notifier;
use crate::watcher::market::{ContentFetcher, IndexQuery};
use crate::watcher::pipeline::Pipeline;
use crate::watcher::window::{confirmed_target, initial_cursor, is_caught_up, next_block};
use anyhow::Result;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub confirmations: u64,
    pub poll_interval: Duration,
    pub batch_size: u64,
    pub start_block: Option<u64>,
    pub seen_horizon_blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Cursor has reached the confirmed target.
    Idle,
    /// Blocks `from..=to` are confirmed but not processed yet.
    CatchingUp { from: u64, to: u64 },
}

/// Polls the registry, drains confirmed blocks batch by batch and persists
/// the cursor after every batch.
pub struct Watcher<S, N, C, I> {
    source: S,
    pipeline: Pipeline<N, C, I>,
    store: CursorStore,
    settings: WatcherSettings,
    cursor: Option<u64>,
}

impl<S, N, C, I> Watcher<S, N, C, I>
where
    S: LogSource,
    N: Notifier,
    C: ContentFetcher,
    I: IndexQuery,
{
    /// Determines the starting cursor from the configured start block, the
    /// persisted state or the current confirmed target, in that order.
    pub async fn bootstrap(
        source: S,
        pipeline: Pipeline<N, C, I>,
        store: CursorStore,
        settings: WatcherSettings,
    ) -> Result<Self> {
        let head = source.head_block().await?;
        let target = confirmed_target(head, settings.confirmations);
        let cursor = initial_cursor(settings.start_block, &store, target);

        Ok(Self {
            source,
            pipeline,
            store,
            settings,
            cursor,
        })
    }

    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn pipeline(&self) -> &Pipeline<N, C, I> {
        &self.pipeline
    }

    pub fn next_state(&self, target: u64) -> LoopState {
        if is_caught_up(self.cursor, target) {
            LoopState::Idle
        } else {
            LoopState::CatchingUp {
                from: next_block(self.cursor),
                to: target,
            }
        }
    }

    /// Runs cycles until `shutdown` is cancelled. Cycle errors are logged and
    /// retried after the poll interval.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        let mut iter_count: usize = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            iter_count += 1;

            match self.run_cycle(&shutdown).await {
                Ok(LoopState::Idle) => {
                    if iter_count % 20 == 0 {
                        info!("📊 Watcher iteration {} | caught up at block {:?}", iter_count, self.cursor);
                    }
                }
                Ok(LoopState::CatchingUp { from, to }) => {
                    info!("📊 Watcher iteration {} | processed blocks {} to {}", iter_count, from, to);
                }
                Err(e) => error!("❌ Watcher cycle failed: {:#}", e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!("Shutting down watcher at block {:?}.", self.cursor);
        Ok(())
    }

    /// One polling cycle: reads the head, then drains every confirmed batch
    /// unless cancelled between batches. Returns the state the cycle started in.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<LoopState> {
        let head = self.source.head_block().await?;
        let target = confirmed_target(head, self.settings.confirmations);

        let state = self.next_state(target);
        let LoopState::CatchingUp { from, to } = state else {
            return Ok(state);
        };

        let planner = BatchPlanner::new(from, to, self.settings.batch_size);
        info!(
            "🔍 Catching up on blocks {} to {} in {} batches (head {})",
            from,
            to,
            planner.total_batches(),
            head
        );

        for range in planner {
            if shutdown.is_cancelled() {
                info!("Stop requested; leaving cursor at {:?}", self.cursor);
                break;
            }
            self.drain_batch(range).await?;
        }

        Ok(state)
    }

    async fn drain_batch(&mut self, range: RangeInclusive<u64>) -> Result<()> {
        info!("Querying blocks {}-{}", range.start(), range.end());

        let events = collect_events(&self.source, &EventKind::ALL, range.clone()).await;
        let summary = self.pipeline.process_batch(&events).await;
        if summary.events > 0 {
            info!(
                "✅ Processed {} events in blocks {} to {} ({} delivered, {} failed)",
                summary.events,
                range.start(),
                range.end(),
                summary.delivered,
                summary.failed
            );
        }

        self.advance_cursor(*range.end())
    }

    fn advance_cursor(&mut self, block_number: u64) -> Result<()> {
        if self.cursor.is_some_and(|current| current >= block_number) {
            return Ok(());
        }

        let horizon_start = block_number.saturating_sub(self.settings.seen_horizon_blocks);
        let engine = self.pipeline.engine_mut();
        engine.evict_before(horizon_start);
        engine.cap_links(MAX_CORRELATION_LINKS);

        let snapshot = engine.snapshot();
        self.store.save_with_correlations(block_number, &snapshot)?;
        // Only a persisted block counts as processed.
        self.cursor = Some(block_number);
        Ok(())
    }
}
