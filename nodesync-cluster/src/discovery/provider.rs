//! Node snapshot provider

use async_trait::async_trait;
use nodesync_core::{NodeInfo, Result, Snapshot};

use super::source::{ClusterMember, NodeSource};

/// Produces normalized snapshots of the cluster
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot>;
}

/// Snapshot provider on top of a cluster membership source
pub struct ClusterSnapshotProvider<S> {
    source: S,
}

impl<S: NodeSource> ClusterSnapshotProvider<S> {
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: NodeSource> SnapshotProvider for ClusterSnapshotProvider<S> {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let members = self.source.list_members().await?;
        let total = members.len();
        let snapshot = normalize(members);

        tracing::debug!(
            members = total,
            routable = snapshot.len(),
            "Fetched cluster snapshot"
        );

        Ok(snapshot)
    }
}

/// Turn raw members into a snapshot.
///
/// Members without a name or without an internal address cannot be used as
/// backends and are dropped.
#[must_use]
pub fn normalize(members: Vec<ClusterMember>) -> Snapshot {
    let nodes = members
        .into_iter()
        .filter_map(|member| {
            if member.name.is_empty() {
                tracing::warn!("Skipping cluster member without a name");
                return None;
            }
            let Some(internal_ip) = member.internal_address() else {
                tracing::debug!(node = %member.name, "Skipping node without internal address");
                return None;
            };
            Some(NodeInfo {
                internal_ip: internal_ip.to_string(),
                external_ips: member.external_addresses(),
                name: member.name,
            })
        })
        .collect();

    Snapshot::new(nodes)
}
