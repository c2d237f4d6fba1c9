//! Cluster membership discovery and snapshot normalization

pub mod kubernetes;
pub mod provider;
pub mod source;

pub use kubernetes::KubeNodeSource;
pub use provider::{ClusterSnapshotProvider, SnapshotProvider};
pub use source::{AddressKind, ClusterMember, MemberAddress, NodeSource};
