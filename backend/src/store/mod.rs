pub mod state;

pub use state::{CorrelationSnapshot, CursorStore, StateError};
