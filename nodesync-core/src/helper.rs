//! Downstream helper interface

use async_trait::async_trait;

use crate::{Result, Snapshot};

/// A downstream consumer of node set changes.
///
/// Helpers render the snapshot into their own external representation and
/// apply it. `apply` may be called again with the same snapshot after a
/// later helper failed, so it must be safe to reapply.
#[async_trait]
pub trait NodeHelper: Send + Sync {
    /// Configuration tag this helper was built from (e.g. "haproxy")
    fn name(&self) -> &str;

    /// Apply an updated node snapshot
    async fn apply(&self, snapshot: &Snapshot) -> Result<()>;
}
