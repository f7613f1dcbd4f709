pub mod app;
pub mod constants;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
pub mod watcher;

#[cfg(test)]
pub mod test_utils;

pub use utils::config::Config;

// Re-export common types
pub use anyhow::Result;
