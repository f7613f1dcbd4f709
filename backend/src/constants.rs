// =============================================================================
// Curate Watch Constants
// =============================================================================
// This file contains all constants used throughout the watcher to enable
// easy tuning and configuration from a single location.

// =============================================================================
// CONTRACT ADDRESSES
// =============================================================================

/// Light curate registry listing Seer markets on Gnosis Chain
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x5aaf9e23a11440f8c1ad6d2e2e5109c7e52cc672";

// =============================================================================
// BLOCKCHAIN CONFIGURATION
// =============================================================================

/// Gnosis Chain ID, used in Seer and Curate links
pub const GNOSIS_CHAIN_ID: u64 = 100;

/// Public Gnosis Chain RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://rpc.gnosischain.com";

/// Block explorer transaction prefix
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://gnosisscan.io/tx/";

/// Timeout for a single RPC request
pub const RPC_REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// WATCHER CONFIGURATION
// =============================================================================

/// Blocks kept out of reach of the watcher to absorb shallow reorgs
pub const DEFAULT_CONFIRMATIONS: u64 = 3;

/// Seconds to sleep between polling cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Maximum number of blocks requested per eth_getLogs call
pub const DEFAULT_BATCH_SIZE: u64 = 200;

/// Lower bound on how many blocks a delivered transaction hash is remembered
pub const MIN_SEEN_HORIZON_BLOCKS: u64 = 1_000;

/// Seen horizon expressed as a multiple of the confirmation depth
pub const SEEN_HORIZON_CONFIRMATION_MULTIPLIER: u64 = 4;

/// Upper bound on evidence group and content reference links kept (and
/// persisted); the oldest links are dropped first
pub const MAX_CORRELATION_LINKS: usize = 20_000;

/// Default location of the persisted watcher state
pub const DEFAULT_STATE_FILE: &str = "state.json";

// =============================================================================
// TELEGRAM CONFIGURATION
// =============================================================================

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram rejects messages above 4096 characters; leave room for the marker
pub const MAX_MESSAGE_LENGTH: usize = 3900;

/// Longest market name shown before escaping; keeps the link lines in budget
pub const MAX_MARKET_NAME_LENGTH: usize = 500;

/// Appended to messages cut at `MAX_MESSAGE_LENGTH`
pub const TRUNCATION_MARKER: &str = "\n… (truncated)";

/// Rich-text mode used for every notification
pub const TELEGRAM_PARSE_MODE: &str = "HTML";

/// Timeout for a single sendMessage call
pub const TELEGRAM_REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// MARKET RESOLUTION
// =============================================================================

/// IPFS gateway used to fetch registry item documents
pub const DEFAULT_IPFS_GATEWAY_URL: &str = "https://cdn.kleros.link";

/// Timeout for IPFS and subgraph lookups
pub const LOOKUP_TIMEOUT_SECS: u64 = 20;

// =============================================================================
// LINKS
// =============================================================================

/// Seer market page prefix (chain id appended)
pub const SEER_MARKETS_URL: &str = "https://app.seer.pm/markets";

/// Kleros Curate registry page prefix (chain id appended)
pub const CURATE_TCR_URL: &str = "https://curate.kleros.io/tcr";
