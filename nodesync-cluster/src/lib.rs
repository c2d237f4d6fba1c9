pub mod discovery;
pub mod reconcile;

pub use discovery::{
    AddressKind, ClusterMember, ClusterSnapshotProvider, KubeNodeSource, MemberAddress,
    NodeSource, SnapshotProvider,
};
pub use reconcile::{Reconciler, Schedule, Scheduler, TickOutcome};
