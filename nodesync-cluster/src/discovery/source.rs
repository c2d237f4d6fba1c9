//! Cluster membership source contract

use async_trait::async_trait;
use nodesync_core::Result;

/// Kind of a reported member address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressKind {
    Internal,
    External,
    /// Hostnames, DNS names and anything else the cluster reports
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAddress {
    pub kind: AddressKind,
    pub address: String,
}

impl MemberAddress {
    #[must_use]
    pub fn internal(address: impl Into<String>) -> Self {
        Self {
            kind: AddressKind::Internal,
            address: address.into(),
        }
    }

    #[must_use]
    pub fn external(address: impl Into<String>) -> Self {
        Self {
            kind: AddressKind::External,
            address: address.into(),
        }
    }
}

/// A cluster member as reported by the membership API, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    pub name: String,
    pub addresses: Vec<MemberAddress>,
}

impl ClusterMember {
    #[must_use]
    pub fn new(name: impl Into<String>, addresses: Vec<MemberAddress>) -> Self {
        Self {
            name: name.into(),
            addresses,
        }
    }

    /// First non-empty internal address
    #[must_use]
    pub fn internal_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .filter(|a| a.kind == AddressKind::Internal)
            .map(|a| a.address.as_str())
            .find(|a| !a.is_empty())
    }

    /// All non-empty external addresses, in reported order
    #[must_use]
    pub fn external_addresses(&self) -> Vec<String> {
        self.addresses
            .iter()
            .filter(|a| a.kind == AddressKind::External && !a.address.is_empty())
            .map(|a| a.address.clone())
            .collect()
    }
}

/// Source of the cluster's current members
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List every current member. Failures map to `Error::Fetch`.
    async fn list_members(&self) -> Result<Vec<ClusterMember>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_internal_address_wins() {
        let member = ClusterMember::new(
            "n1",
            vec![
                MemberAddress::internal(""),
                MemberAddress::internal("10.0.0.1"),
                MemberAddress::internal("10.0.0.2"),
            ],
        );
        assert_eq!(member.internal_address(), Some("10.0.0.1"));
    }

    #[test]
    fn test_external_addresses_keep_order() {
        let member = ClusterMember::new(
            "n1",
            vec![
                MemberAddress::external("5.6.7.8"),
                MemberAddress::internal("10.0.0.1"),
                MemberAddress {
                    kind: AddressKind::Other("Hostname".to_string()),
                    address: "n1".to_string(),
                },
                MemberAddress::external("1.2.3.4"),
            ],
        );
        assert_eq!(member.external_addresses(), vec!["5.6.7.8", "1.2.3.4"]);
    }

    #[test]
    fn test_no_internal_address() {
        let member = ClusterMember::new("n1", vec![MemberAddress::external("1.2.3.4")]);
        assert_eq!(member.internal_address(), None);
    }
}
