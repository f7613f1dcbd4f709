use alloy::primitives::Address;

/// What is known about the Seer market behind a registry item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketDetails {
    pub address: Option<Address>,
    pub name: Option<String>,
}

impl MarketDetails {
    pub fn is_complete(&self) -> bool {
        self.address.is_some() && self.name.is_some()
    }
}
