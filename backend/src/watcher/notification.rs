use crate::constants::*;
use crate::models::{EventKind, MarketDetails, RawEvent};
use alloy::primitives::Address;

/// Renders Telegram HTML messages for registry events.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    registry: Address,
    explorer_tx_url: String,
}

impl NotificationBuilder {
    pub fn new(registry: Address, explorer_tx_url: impl Into<String>) -> Self {
        Self {
            registry,
            explorer_tx_url: explorer_tx_url.into(),
        }
    }

    /// Builds the message for `event`, or `None` when the event is not
    /// notifiable or no item id is known.
    pub fn build(&self, event: &RawEvent, item_id: &str, market: &MarketDetails) -> Option<String> {
        if item_id.trim().is_empty() {
            return None;
        }

        let message = match event.kind {
            EventKind::NewItem | EventKind::RequestSubmitted => self.submission_message(event, item_id, market),
            EventKind::Dispute => self.dispute_message(event, item_id, market),
            _ => return None,
        };
        Some(truncate_message(message))
    }

    fn submission_message(&self, event: &RawEvent, item_id: &str, market: &MarketDetails) -> String {
        let market_target = market
            .address
            .map(|address| format!("0x{}", hex::encode(address)))
            .unwrap_or_else(|| item_id.to_string());

        let mut lines = vec!["A new market has been submitted for verification.".to_string()];
        if let Some(name) = &market.name {
            lines.push(market_line(name));
        }
        lines.push(format!("Seer: {}", link(&seer_url(&market_target), "check here")));
        lines.push(format!("Curate: {}", link(&self.curate_url(item_id), "check here")));
        lines.push(format!("Transaction: {}", link(&self.tx_url(event), "view")));
        lines.join("\n")
    }

    fn dispute_message(&self, event: &RawEvent, item_id: &str, market: &MarketDetails) -> String {
        let headline = match event.args.find("disputeID") {
            Some(dispute_id) => format!("A market verification request has been challenged (dispute #{}).", dispute_id),
            None => "A market verification request has been challenged.".to_string(),
        };

        let mut lines = vec![headline];
        if let Some(name) = &market.name {
            lines.push(market_line(name));
        }
        if let Some(address) = market.address {
            let target = format!("0x{}", hex::encode(address));
            lines.push(format!("Seer: {}", link(&seer_url(&target), "check here")));
        }
        lines.push(format!("Curate: {}", link(&self.curate_url(item_id), "check here")));
        lines.push(format!("Transaction: {}", link(&self.tx_url(event), "view")));
        lines.join("\n")
    }

    fn curate_url(&self, item_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            CURATE_TCR_URL,
            GNOSIS_CHAIN_ID,
            self.registry.to_checksum(None),
            item_id
        )
    }

    fn tx_url(&self, event: &RawEvent) -> String {
        format!("{}/{}", self.explorer_tx_url.trim_end_matches('/'), event.tx_hash_hex())
    }
}

fn seer_url(target: &str) -> String {
    format!("{}/{}/{}", SEER_MARKETS_URL, GNOSIS_CHAIN_ID, target)
}

fn market_line(name: &str) -> String {
    let shown = if name.chars().count() > MAX_MARKET_NAME_LENGTH {
        let mut cut: String = name.chars().take(MAX_MARKET_NAME_LENGTH).collect();
        cut.push('…');
        cut
    } else {
        name.to_string()
    };
    format!("Market: {}", escape_html(&shown))
}

fn link(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(href), label)
}

/// Cuts messages above `MAX_MESSAGE_LENGTH` characters and appends a marker.
///
/// The cut lands on a line boundary so no HTML tag or entity is split. A
/// message without any line break inside the limit is cut at the limit.
pub fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message;
    }
    let mut truncated: String = message.chars().take(MAX_MESSAGE_LENGTH).collect();
    if let Some(line_end) = truncated.rfind('\n') {
        truncated.truncate(line_end);
    }
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dispute, new_item, registry, tx};

    fn builder() -> NotificationBuilder {
        NotificationBuilder::new(registry(), "https://gnosisscan.io/tx/")
    }

    fn market_address() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    #[test]
    fn test_submission_links_market_address() {
        let event = new_item(10, tx(1), 0x3039u64, "/ipfs/Qm/item.json");
        let market = MarketDetails {
            address: Some(market_address()),
            name: Some("Will it rain?".to_string()),
        };

        let message = builder().build(&event, "0x3039", &market).unwrap();

        assert!(message.starts_with("A new market has been submitted for verification."));
        assert!(message.contains("Market: Will it rain?"));
        assert!(message.contains(
            "<a href=\"https://app.seer.pm/markets/100/0x00000000000000000000000000000000000000aa\">check here</a>"
        ));
        assert!(message.contains(&format!(
            "https://curate.kleros.io/tcr/100/{}/0x3039",
            registry().to_checksum(None)
        )));
        assert!(message.contains(&format!("https://gnosisscan.io/tx/{}", event.tx_hash_hex())));
    }

    #[test]
    fn test_submission_falls_back_to_item_id() {
        let event = new_item(10, tx(1), 0x3039u64, "");

        let message = builder().build(&event, "0x3039", &MarketDetails::default()).unwrap();

        assert!(message.contains("https://app.seer.pm/markets/100/0x3039"));
        assert!(!message.contains("Market:"));
    }

    #[test]
    fn test_dispute_omits_seer_without_market() {
        let event = dispute(12, tx(2), 17u64, 88u64);

        let message = builder().build(&event, "0x1234", &MarketDetails::default()).unwrap();

        assert!(message.starts_with("A market verification request has been challenged (dispute #17)."));
        assert!(!message.contains("app.seer.pm"));
        assert!(message.contains("/0x1234\">check here</a>"));
    }

    #[test]
    fn test_dispute_with_market_links_seer() {
        let event = dispute(12, tx(2), 17u64, 88u64);
        let market = MarketDetails { address: Some(market_address()), name: None };

        let message = builder().build(&event, "0x1234", &market).unwrap();

        assert!(message.contains("app.seer.pm/markets/100/0x00000000000000000000000000000000000000aa"));
    }

    #[test]
    fn test_missing_item_id_builds_nothing() {
        let event = new_item(10, tx(1), 1u64, "");
        assert_eq!(builder().build(&event, "", &MarketDetails::default()), None);
    }

    #[test]
    fn test_non_notifiable_kind_builds_nothing() {
        let mut event = new_item(10, tx(1), 1u64, "");
        event.kind = EventKind::Ruling;
        assert_eq!(builder().build(&event, "0x1", &MarketDetails::default()), None);
    }

    #[test]
    fn test_market_name_is_escaped() {
        let event = new_item(10, tx(1), 1u64, "");
        let market = MarketDetails { address: None, name: Some("<b>A & B</b>".to_string()) };

        let message = builder().build(&event, "0x1", &market).unwrap();

        assert!(message.contains("Market: &lt;b&gt;A &amp; B&lt;/b&gt;"));
    }

    #[test]
    fn test_long_market_name_keeps_link_lines() {
        let event = new_item(10, tx(1), 1u64, "");
        let market = MarketDetails { address: None, name: Some("x".repeat(3_830)) };

        let message = builder().build(&event, "0x1", &market).unwrap();

        assert!(!message.ends_with(TRUNCATION_MARKER));
        assert!(message.contains(&format!("Market: {}…\n", "x".repeat(MAX_MARKET_NAME_LENGTH))));
        assert_eq!(message.matches("<a href=").count(), 3);
        assert_eq!(message.matches("</a>").count(), 3);
        assert!(message.ends_with(">view</a>"));
    }

    #[test]
    fn test_escaped_name_is_not_split() {
        let event = new_item(10, tx(1), 1u64, "");
        let market = MarketDetails { address: None, name: Some("&".repeat(5_000)) };

        let message = builder().build(&event, "0x1", &market).unwrap();

        let name_line = message.lines().find(|line| line.starts_with("Market: ")).unwrap();
        assert_eq!(name_line, format!("Market: {}…", "&amp;".repeat(MAX_MARKET_NAME_LENGTH)));
        assert!(message.chars().count() <= MAX_MESSAGE_LENGTH);
    }

    #[test]
    fn test_truncation_cuts_on_line_boundary() {
        let long_line = format!("<a href=\"https://x.io\">{}</a>", "y".repeat(MAX_MESSAGE_LENGTH));
        let message = format!("first line\nsecond &amp; line\n{}", long_line);

        let truncated = truncate_message(message);

        assert_eq!(truncated, format!("first line\nsecond &amp; line{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_single_long_line_is_cut_at_limit() {
        let truncated = truncate_message("z".repeat(MAX_MESSAGE_LENGTH + 10));

        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            truncated.chars().count(),
            MAX_MESSAGE_LENGTH + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(truncate_message("hello".to_string()), "hello");
    }
}
