pub mod config;
pub mod logging;
pub mod item_id;

pub use config::Config;
pub use logging::init_logging;
