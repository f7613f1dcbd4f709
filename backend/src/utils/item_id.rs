use alloy::primitives::U256;
use crate::models::{ArgValue, EventArgs};

/// Normalizes an item identifier argument to a lowercase `0x` hex string.
///
/// Words and addresses are hex-encoded, integers are converted to hex and
/// strings go through [`normalize_item_id_str`].
pub fn normalize_item_id(value: &ArgValue) -> String {
    match value {
        ArgValue::Word(word) => format!("0x{}", hex::encode(word)),
        ArgValue::Address(address) => format!("0x{}", hex::encode(address)),
        ArgValue::Uint(number) => format!("0x{:x}", number),
        ArgValue::Bool(flag) => flag.to_string(),
        ArgValue::Text(text) => normalize_item_id_str(text),
    }
}

/// Normalizes a textual item identifier.
///
/// `0x` values are lower-cased, decimal strings are converted to hex, bare
/// hex strings get a `0x` prefix. Digit strings with a leading zero are not
/// decimal literals and are read as bare hex (`"0042"` is `0x0042`).
/// Anything else is returned trimmed but otherwise unchanged.
pub fn normalize_item_id_str(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return trimmed.to_lowercase();
    }

    let is_decimal = !trimmed.is_empty()
        && trimmed.bytes().all(|b| b.is_ascii_digit())
        && (trimmed == "0" || !trimmed.starts_with('0'));
    if is_decimal {
        if let Ok(number) = U256::from_str_radix(trimmed, 10) {
            return format!("0x{:x}", number);
        }
    }

    if let Ok(bytes) = hex::decode(trimmed) {
        if !bytes.is_empty() {
            return format!("0x{}", hex::encode(bytes));
        }
    }

    trimmed.to_string()
}

/// Pulls the normalized `itemID` out of an event's arguments, if any.
pub fn extract_item_id(args: &EventArgs) -> Option<String> {
    args.find("itemID")
        .map(normalize_item_id)
        .filter(|id| !id.is_empty())
}

/// Pulls the `evidenceGroupID` out of an event's arguments as a map key.
///
/// Integers are keyed by their decimal form so the same group reads the same
/// whether it arrives as a number or as text.
pub fn extract_evidence_group(args: &EventArgs) -> Option<String> {
    let key = match args.find("evidenceGroupID")? {
        ArgValue::Uint(number) => number.to_string(),
        ArgValue::Text(text) => {
            let trimmed = text.trim();
            match U256::from_str_radix(trimmed, 10) {
                Ok(number) => number.to_string(),
                Err(_) => trimmed.to_string(),
            }
        }
        other => other.to_string(),
    };
    (!key.is_empty()).then_some(key)
}
