pub mod batches;
pub mod collector;
pub mod correlation;
pub mod delivery;
pub mod market;
pub mod notification;
pub mod pipeline;
pub mod runner;
pub mod window;

pub use collector::LogSource;
pub use correlation::CorrelationEngine;
pub use delivery::{DeliveryError, Notifier};
pub use market::{ContentFetcher, IndexQuery, MarketResolver};
pub use notification::NotificationBuilder;
pub use pipeline::{DeliveryMode, Pipeline};
pub use runner::{Watcher, WatcherSettings};
