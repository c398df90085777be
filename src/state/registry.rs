use serde::{Deserialize, Serialize};

/// Network name reported for private and loopback addresses
pub const LOCAL_NETNAME: &str = "local";

/// Ownership metadata for one queried address
///
/// Every field except `address` is empty when the registries had nothing useful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    pub address: String,
    pub netname: String,
    /// AS number, digits only
    #[serde(rename = "as")]
    pub asn: String,
    pub country: String,
}

impl RegistryInfo {
    /// Result carrying no metadata, only the address it describes
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Synthetic result for addresses that never leave the local network
    pub fn local(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            netname: LOCAL_NETNAME.to_string(),
            ..Default::default()
        }
    }

    /// Number of populated fields among netname, AS and country
    pub fn populated(&self) -> usize {
        [&self.netname, &self.asn, &self.country]
            .iter()
            .filter(|field| !field.is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.populated() == 0
    }
}
