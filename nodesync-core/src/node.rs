//! Node descriptors, snapshots and change detection

use serde::Serialize;

/// A cluster member that can be used as a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    /// Unique, non-empty member name
    pub name: String,
    /// Address used for intra-cluster / backend routing
    pub internal_ip: String,
    /// Publicly routable addresses, in the order the cluster reports them
    pub external_ips: Vec<String>,
}

impl NodeInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, internal_ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal_ip: internal_ip.into(),
            external_ips: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_external_ips<I, S>(mut self, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_ips = ips.into_iter().map(Into::into).collect();
        self
    }

    /// Field-wise comparison used by change detection. External addresses
    /// compare as an ordered list.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.internal_ip == other.internal_ip
            && self.external_ips == other.external_ips
    }
}

/// The cluster as observed by one successful fetch.
///
/// Nodes are sorted ascending by name and names are unique. The only way to
/// build a snapshot is [`Snapshot::new`], which enforces both.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    nodes: Vec<NodeInfo>,
}

impl Snapshot {
    /// Normalize discovered nodes into a snapshot.
    ///
    /// When two nodes share a name the one discovered first is kept.
    #[must_use]
    pub fn new(mut nodes: Vec<NodeInfo>) -> Self {
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes.dedup_by(|later, earlier| later.name == earlier.name);
        Self { nodes }
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in snapshot order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// External addresses of all nodes: node order, then per-node order
    #[must_use]
    pub fn external_ips(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .flat_map(|n| n.external_ips.iter().map(String::as_str))
            .collect()
    }
}

/// Whether `current` differs from the last accepted snapshot.
///
/// A missing previous snapshot compares like an empty one, so an empty
/// cluster on the first tick is not a change.
#[must_use]
pub fn has_changed(previous: Option<&Snapshot>, current: &Snapshot) -> bool {
    let previous = previous.map_or(&[][..], Snapshot::nodes);
    let current = current.nodes();

    if previous.len() != current.len() {
        return true;
    }

    previous
        .iter()
        .zip(current)
        .any(|(before, after)| !before.same_as(after))
}
