use crate::constants::TELEGRAM_PARSE_MODE;
use crate::models::RawEvent;
use crate::watcher::correlation::{CorrelationEngine, Verdict};
use crate::watcher::delivery::{deliver, Notifier, SendOptions};
use crate::watcher::market::{ContentFetcher, IndexQuery, MarketResolver};
use crate::watcher::notification::NotificationBuilder;
use alloy::primitives::Address;
use anyhow::Result;
use tracing::{error, info, warn};

/// Whether rendered messages are sent or only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Send,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Duplicate,
    /// No item id could be extracted from a submission.
    MissingItem,
    /// Dispute that could not be linked to any item.
    Unattributed,
    Delivered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub events: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Correlates events and turns the notifiable ones into delivered messages.
///
/// Owns the working chat id: after a chat migration every later message goes
/// to the new chat.
pub struct Pipeline<N, C, I> {
    engine: CorrelationEngine,
    markets: MarketResolver<C, I>,
    builder: NotificationBuilder,
    notifier: N,
    registry: Address,
    chat_id: String,
    mode: DeliveryMode,
}

impl<N: Notifier, C: ContentFetcher, I: IndexQuery> Pipeline<N, C, I> {
    pub fn new(
        engine: CorrelationEngine,
        markets: MarketResolver<C, I>,
        builder: NotificationBuilder,
        notifier: N,
        registry: Address,
        chat_id: impl Into<String>,
        mode: DeliveryMode,
    ) -> Self {
        Self {
            engine,
            markets,
            builder,
            notifier,
            registry,
            chat_id: chat_id.into(),
            mode,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn engine(&self) -> &CorrelationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CorrelationEngine {
        &mut self.engine
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Handles events in order. A failing event is logged and does not stop
    /// the ones after it.
    pub async fn process_batch(&mut self, events: &[RawEvent]) -> BatchSummary {
        let mut summary = BatchSummary {
            events: events.len(),
            ..BatchSummary::default()
        };

        for event in events {
            match self.handle_event(event).await {
                Ok(EventOutcome::Delivered) => summary.delivered += 1,
                Ok(_) => {}
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        "❌ Failed to send notification for {} (block {}) | tx={}: {:#}",
                        event.kind,
                        event.block_number(),
                        event.tx_hash_hex(),
                        e
                    );
                }
            }
        }
        summary
    }

    pub async fn handle_event(&mut self, event: &RawEvent) -> Result<EventOutcome> {
        info!(
            "Detected event {} | block={} | tx={} | address={} | args={}",
            event.kind,
            event.block_number(),
            event.tx_hash_hex(),
            event.address.to_checksum(None),
            event.args
        );

        match self.engine.observe(event) {
            Verdict::Ignore => Ok(EventOutcome::Ignored),
            Verdict::Duplicate => {
                info!("Skipping duplicate notification for tx={}", event.tx_hash_hex());
                Ok(EventOutcome::Duplicate)
            }
            Verdict::Submission { item_id: None } => {
                warn!(
                    "Skipping notification for {} | tx={}; could not extract item ID.",
                    event.kind,
                    event.tx_hash_hex()
                );
                Ok(EventOutcome::MissingItem)
            }
            Verdict::Submission { item_id: Some(item_id) } => self.notify(event, &item_id).await,
            Verdict::Dispute { item_id: Some(item_id), .. } => self.notify(event, &item_id).await,
            Verdict::Dispute { item_id: None, evidence_group } => {
                let resolved = match &evidence_group {
                    Some(group) => self.markets.index().item_for_evidence_group(group, self.registry).await,
                    None => None,
                };

                match (resolved, evidence_group) {
                    (Some(item_id), Some(group)) => {
                        self.engine.link_evidence_group(&group, &item_id, event.block_number());
                        self.notify(event, &item_id).await
                    }
                    (_, group) => {
                        warn!(
                            "Dispute at block {} | tx={} has unknown evidence group {:?}; no item to attribute it to.",
                            event.block_number(),
                            event.tx_hash_hex(),
                            group
                        );
                        Ok(EventOutcome::Unattributed)
                    }
                }
            }
        }
    }

    async fn notify(&mut self, event: &RawEvent, item_id: &str) -> Result<EventOutcome> {
        let content_ref = self.engine.content_ref(item_id).map(str::to_owned);
        let market = self
            .markets
            .resolve(item_id, content_ref.as_deref(), self.registry)
            .await;

        let Some(message) = self.builder.build(event, item_id, &market) else {
            warn!("Skipping notification for {} | tx={}; nothing to render.", event.kind, event.tx_hash_hex());
            return Ok(EventOutcome::MissingItem);
        };

        self.dispatch(&message).await?;
        self.engine.mark_delivered(event);

        info!(
            "✅ Sent notification for {} (block {}) | tx={}",
            event.kind,
            event.block_number(),
            event.tx_hash_hex()
        );
        Ok(EventOutcome::Delivered)
    }

    async fn dispatch(&mut self, message: &str) -> Result<()> {
        if self.mode == DeliveryMode::DryRun {
            info!("📝 Dry run, not sending:\n{}", message);
            return Ok(());
        }

        let options = SendOptions {
            parse_mode: Some(TELEGRAM_PARSE_MODE),
            disable_preview: Some(false),
        };
        let delivered_to = deliver(&self.notifier, &self.chat_id, message, &options).await?;
        if delivered_to != self.chat_id {
            info!("🔀 Working chat is now {}", delivered_to);
            self.chat_id = delivered_to;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use crate::test_utils::*;
    use serde_json::json;

    type TestPipeline = Pipeline<RecordingNotifier, StaticContent, StaticIndex>;

    fn pipeline_with(notifier: RecordingNotifier, content: StaticContent, index: StaticIndex) -> TestPipeline {
        Pipeline::new(
            CorrelationEngine::new(),
            MarketResolver::new(content, index),
            NotificationBuilder::new(registry(), "https://gnosisscan.io/tx/"),
            notifier,
            registry(),
            "C1",
            DeliveryMode::Send,
        )
    }

    fn pipeline() -> TestPipeline {
        pipeline_with(RecordingNotifier::new(), StaticContent::new(), StaticIndex::new())
    }

    #[tokio::test]
    async fn test_two_requests_in_same_tx_notify_once() {
        let mut pipeline = pipeline();
        let events = vec![
            request_submitted(10, tx(0xabc), 1u64, 5u64),
            request_submitted(10, tx(0xabc), 1u64, 5u64),
        ];

        let summary = pipeline.process_batch(&events).await;

        assert_eq!(summary, BatchSummary { events: 2, delivered: 1, failed: 0 });
        assert_eq!(pipeline.notifier().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_new_item_and_request_in_same_tx_notify_once() {
        let mut pipeline = pipeline();
        let events = vec![
            new_item(10, tx(1), 0x42u64, "/ipfs/QmItem/item.json"),
            request_submitted(10, tx(1), 0x42u64, 9u64),
        ];

        pipeline.process_batch(&events).await;

        let sent = pipeline.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("A new market has been submitted"));
    }

    #[tokio::test]
    async fn test_dispute_correlated_through_evidence_group() {
        let content = StaticContent::new().with(
            "/ipfs/QmItem/item.json",
            json!({ "values": { "Market": "0x1111111111111111111111111111111111111111", "Market name": "Rain?" } }),
        );
        let mut pipeline = pipeline_with(RecordingNotifier::new(), content, StaticIndex::new());
        let events = vec![
            new_item(10, tx(1), 0x42u64, "/ipfs/QmItem/item.json"),
            request_submitted(10, tx(1), 0x42u64, 9u64),
            dispute(12, tx(2), 3u64, 9u64),
        ];

        let summary = pipeline.process_batch(&events).await;

        assert_eq!(summary.delivered, 2);
        let sent = pipeline.notifier().sent();
        assert!(sent[1].1.starts_with("A market verification request has been challenged (dispute #3)."));
        assert!(sent[1].1.contains("Market: Rain?"));
        assert!(sent[1].1.contains("app.seer.pm/markets/100/0x1111111111111111111111111111111111111111"));
        assert!(sent[1].1.contains("/0x42\">check here</a>"));
    }

    #[tokio::test]
    async fn test_unknown_dispute_is_dropped() {
        let mut pipeline = pipeline();

        let outcome = pipeline.handle_event(&dispute(12, tx(2), 3u64, 999u64)).await.unwrap();

        assert_eq!(outcome, EventOutcome::Unattributed);
        assert!(pipeline.notifier().sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispute_resolved_by_index_is_remembered() {
        let index = StaticIndex::new().with_evidence_group("999", "0x77");
        let mut pipeline = pipeline_with(RecordingNotifier::new(), StaticContent::new(), index);

        let outcome = pipeline.handle_event(&dispute(12, tx(2), 3u64, 999u64)).await.unwrap();

        assert_eq!(outcome, EventOutcome::Delivered);
        assert_eq!(
            pipeline.engine().snapshot().evidence_groups.get("999").map(String::as_str),
            Some("0x77")
        );
    }

    #[tokio::test]
    async fn test_replayed_batch_only_repeats_disputes() {
        let mut pipeline = pipeline();
        let events = vec![
            new_item(10, tx(1), 0x42u64, ""),
            request_submitted(10, tx(1), 0x42u64, 9u64),
            request_submitted(11, tx(3), 0x43u64, 10u64),
            dispute(12, tx(2), 3u64, 9u64),
        ];

        let first = pipeline.process_batch(&events).await;
        let second = pipeline.process_batch(&events).await;

        assert_eq!(first.delivered, 3);
        assert_eq!(second.delivered, 1);
        let disputes = pipeline
            .notifier()
            .sent()
            .iter()
            .filter(|(_, text)| text.contains("challenged"))
            .count();
        assert_eq!(disputes, 2);
    }

    #[tokio::test]
    async fn test_submission_after_dispute_in_same_tx_is_delivered() {
        let mut pipeline = pipeline();
        let mut second_submission = request_submitted(12, tx(2), 0x43u64, 10u64);
        second_submission.position.log_index = 5;
        let events = vec![
            request_submitted(10, tx(1), 0x42u64, 9u64),
            dispute(12, tx(2), 3u64, 9u64),
            second_submission,
        ];

        let summary = pipeline.process_batch(&events).await;

        assert_eq!(summary.delivered, 3);
        assert!(pipeline.engine().is_seen(&tx(2)));
        let sent = pipeline.notifier().sent();
        assert!(sent[1].1.contains("challenged"));
        assert!(sent[2].1.starts_with("A new market has been submitted"));
    }

    #[tokio::test]
    async fn test_migration_updates_working_chat() {
        let notifier = RecordingNotifier::new().migrating("C1", -100_500);
        let mut pipeline = pipeline_with(notifier, StaticContent::new(), StaticIndex::new());
        let events = vec![
            new_item(10, tx(1), 0x1u64, ""),
            new_item(11, tx(2), 0x2u64, ""),
        ];

        pipeline.process_batch(&events).await;

        assert_eq!(pipeline.chat_id(), "-100500");
        let chats: Vec<String> = pipeline.notifier().sent().into_iter().map(|(chat, _)| chat).collect();
        assert_eq!(chats, vec!["-100500".to_string(), "-100500".to_string()]);
        assert_eq!(pipeline.notifier().attempts(), vec!["C1", "-100500", "-100500"]);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_isolated_and_not_marked() {
        let notifier = RecordingNotifier::new().rate_limited("C1", 5);
        let mut pipeline = pipeline_with(notifier, StaticContent::new(), StaticIndex::new());
        let events = vec![
            new_item(10, tx(1), 0x1u64, ""),
            new_item(11, tx(2), 0x2u64, ""),
        ];

        let summary = pipeline.process_batch(&events).await;

        assert_eq!(summary, BatchSummary { events: 2, delivered: 0, failed: 2 });
        assert!(!pipeline.engine().is_seen(&tx(1)));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing_but_dedups() {
        let mut pipeline = pipeline();
        pipeline.mode = DeliveryMode::DryRun;
        let events = vec![
            request_submitted(10, tx(1), 0x1u64, 1u64),
            request_submitted(10, tx(1), 0x1u64, 1u64),
        ];

        let summary = pipeline.process_batch(&events).await;

        assert_eq!(summary.delivered, 1);
        assert!(pipeline.notifier().attempts().is_empty());
    }

    #[tokio::test]
    async fn test_submission_without_item_id() {
        let mut pipeline = pipeline();
        let mut event = event_at(EventKind::NewItem, 10, 0, 0);
        event.transaction_hash = tx(44);

        let outcome = pipeline.handle_event(&event).await.unwrap();

        assert_eq!(outcome, EventOutcome::MissingItem);
        assert!(!pipeline.engine().is_seen(&tx(44)));
    }
}
