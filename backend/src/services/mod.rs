pub mod ipfs;
pub mod rpc;
pub mod subgraph;
pub mod telegram;

pub use ipfs::IpfsGateway;
pub use rpc::{connect_http, RegistryLogSource};
pub use subgraph::CurateSubgraph;
pub use telegram::TelegramClient;
