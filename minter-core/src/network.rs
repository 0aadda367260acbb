//! Collection identity: network + bigmap id.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// NETWORK
// ============================================================================

/// Tezos network a bigmap lives on.
///
/// Acts as the namespacing key for cached records; nothing else is isolated
/// per network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Delphinet,
    Edo2net,
    Florencenet,
    Sandbox,
}

impl Network {
    /// Every supported network, in declaration order.
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Delphinet,
        Network::Edo2net,
        Network::Florencenet,
        Network::Sandbox,
    ];

    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Delphinet => "delphinet",
            Network::Edo2net => "edo2net",
            Network::Florencenet => "florencenet",
            Network::Sandbox => "sandbox",
        }
    }

    /// Parse a network name, rejecting anything outside the known set.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "delphinet" => Ok(Network::Delphinet),
            "edo2net" => Ok(Network::Edo2net),
            "florencenet" => Ok(Network::Florencenet),
            "sandbox" => Ok(Network::Sandbox),
            _ => Err(ValidationError::UnsupportedNetwork {
                network: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// COLLECTION ID
// ============================================================================

/// Remote bigmap identifier. Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "i64", into = "i64")]
pub struct CollectionId(i64);

impl CollectionId {
    pub fn new(id: i64) -> Result<Self, ValidationError> {
        if id < 0 {
            return Err(ValidationError::InvalidCollectionId {
                raw: id.to_string(),
            });
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for CollectionId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionId> for i64 {
    fn from(id: CollectionId) -> Self {
        id.0
    }
}

impl FromStr for CollectionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidCollectionId { raw: s.to_string() })
            .and_then(|id| {
                Self::new(id).map_err(|_| ValidationError::InvalidCollectionId { raw: s.to_string() })
            })
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// COLLECTION KEY
// ============================================================================

/// Uniquely identifies a remote paginated collection.
///
/// Holding a `CollectionKey` means the network has already been validated,
/// so the cache never sees an unsupported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CollectionKey {
    pub network: Network,
    pub collection_id: CollectionId,
}

impl CollectionKey {
    pub fn new(network: Network, collection_id: CollectionId) -> Self {
        Self {
            network,
            collection_id,
        }
    }

    /// Validate raw path input. The id is checked before the network.
    pub fn parse(network: &str, collection_id: &str) -> Result<Self, ValidationError> {
        let collection_id = collection_id.parse::<CollectionId>()?;
        let network = Network::parse(network)?;
        Ok(Self::new(network, collection_id))
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.collection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_round_trips_through_str() {
        for network in Network::ALL {
            assert_eq!(Network::parse(network.as_str()), Ok(network));
        }
    }

    #[test]
    fn test_network_parse_is_case_insensitive() {
        assert_eq!(Network::parse("Edo2Net"), Ok(Network::Edo2net));
        assert_eq!(" mainnet ".parse::<Network>(), Ok(Network::Mainnet));
    }

    #[test]
    fn test_unknown_network_rejected_with_original_name() {
        let err = Network::parse("testnet").unwrap_err();
        assert_eq!(err.to_string(), "Network 'testnet' is not supported");
    }

    #[test]
    fn test_collection_id_parsing() {
        assert_eq!("523".parse::<CollectionId>().map(|id| id.get()), Ok(523));
        assert!("abc".parse::<CollectionId>().is_err());
        assert!("-1".parse::<CollectionId>().is_err());
        assert!("".parse::<CollectionId>().is_err());
        assert!("1.5".parse::<CollectionId>().is_err());
    }

    #[test]
    fn test_collection_key_checks_id_first() {
        let err = CollectionKey::parse("testnet", "nope").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCollectionId { .. }));

        let err = CollectionKey::parse("testnet", "12").unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedNetwork { .. }));

        let key = CollectionKey::parse("edo2net", "12").unwrap();
        assert_eq!(key.to_string(), "edo2net/12");
    }

    #[test]
    fn test_network_serializes_lowercase() {
        let json = serde_json::to_string(&Network::Florencenet).unwrap();
        assert_eq!(json, "\"florencenet\"");
    }

    #[test]
    fn test_collection_id_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<CollectionId>("-4").is_err());
        assert_eq!(serde_json::from_str::<CollectionId>("4").unwrap().get(), 4);
    }
}
