pub mod events;
pub mod market;

pub use events::{ArgValue, EventArgs, EventKind, EventPosition, RawEvent};
pub use market::MarketDetails;
