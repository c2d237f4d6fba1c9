//! Reconciliation loop state machine
//!
//! Each tick fetches a snapshot, compares it with the last accepted one and,
//! on change, applies it to every helper in order. The first helper failure
//! ends the tick without accepting the snapshot, so the next tick retries
//! the full helper sequence from the same baseline.

use std::sync::Arc;

use nodesync_core::{has_changed, NodeHelper, Snapshot};
use tracing::Instrument;

use crate::discovery::SnapshotProvider;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The cluster could not be queried; nothing was applied
    FetchFailed,
    /// The node set matches the accepted snapshot
    Unchanged,
    /// Every helper applied the new snapshot, which is now accepted
    Applied { nodes: usize },
    /// A helper failed; the accepted snapshot is unchanged
    HelperFailed { helper: String },
}

impl TickOutcome {
    /// Whether the tick left the system consistent with the cluster
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Applied { .. })
    }
}

/// Owns the accepted snapshot and drives helpers on change
pub struct Reconciler {
    provider: Arc<dyn SnapshotProvider>,
    helpers: Vec<Arc<dyn NodeHelper>>,
    accepted: Option<Snapshot>,
}

impl Reconciler {
    #[must_use]
    pub fn new(provider: Arc<dyn SnapshotProvider>, helpers: Vec<Arc<dyn NodeHelper>>) -> Self {
        Self {
            provider,
            helpers,
            accepted: None,
        }
    }

    /// Last snapshot every helper applied successfully
    #[must_use]
    pub const fn accepted(&self) -> Option<&Snapshot> {
        self.accepted.as_ref()
    }

    /// Helper names in apply order
    #[must_use]
    pub fn helper_names(&self) -> Vec<&str> {
        self.helpers.iter().map(|h| h.name()).collect()
    }

    /// Run one reconciliation tick.
    ///
    /// Never fails: every error is logged and reflected in the outcome.
    pub async fn tick(&mut self) -> TickOutcome {
        let span = tracing::info_span!("tick", id = %nanoid::nanoid!(8));
        self.reconcile().instrument(span).await
    }

    async fn reconcile(&mut self) -> TickOutcome {
        let snapshot = match self.provider.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(stage = e.stage(), error = %e, "Failed to fetch cluster nodes");
                return TickOutcome::FetchFailed;
            }
        };

        if !has_changed(self.accepted.as_ref(), &snapshot) {
            tracing::info!(nodes = snapshot.len(), "No changes in cluster nodes");
            return TickOutcome::Unchanged;
        }

        tracing::info!(
            nodes = snapshot.len(),
            names = ?snapshot.names(),
            "Cluster nodes changed, applying to helpers"
        );

        for helper in &self.helpers {
            if let Err(e) = helper.apply(&snapshot).await {
                tracing::error!(
                    helper = helper.name(),
                    stage = e.stage(),
                    error = %e,
                    "Helper failed to apply cluster nodes, will retry next tick"
                );
                return TickOutcome::HelperFailed {
                    helper: helper.name().to_string(),
                };
            }
            tracing::debug!(helper = helper.name(), "Helper applied cluster nodes");
        }

        let nodes = snapshot.len();
        self.accepted = Some(snapshot);
        tracing::info!(nodes, "Cluster nodes applied");

        TickOutcome::Applied { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::testing::{node, ApplyLog, RecordingHelper, ScriptedProvider};
    use nodesync_core::Error;

    fn snapshot_a() -> Snapshot {
        Snapshot::new(vec![node("n1", "10.0.0.1"), node("n2", "10.0.0.2")])
    }

    fn snapshot_b() -> Snapshot {
        Snapshot::new(vec![
            node("n1", "10.0.0.1"),
            node("n2", "10.0.0.2"),
            node("n3", "10.0.0.3"),
        ])
    }

    #[tokio::test]
    async fn test_end_to_end_partial_failure_and_retry() {
        let log = ApplyLog::default();
        let provider = ScriptedProvider::new(vec![
            Ok(snapshot_a()),
            Ok(snapshot_a()),
            Ok(snapshot_b()),
            Ok(snapshot_b()),
        ]);
        let second = RecordingHelper::new("second", &log);
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![
                Arc::new(RecordingHelper::new("first", &log)),
                Arc::new(second.clone()),
                Arc::new(RecordingHelper::new("third", &log)),
            ],
        );

        // Tick 1: first snapshot goes to every helper
        assert_eq!(reconciler.tick().await, TickOutcome::Applied { nodes: 2 });
        assert_eq!(reconciler.accepted().unwrap().names(), vec!["n1", "n2"]);
        assert_eq!(log.helpers(), vec!["first", "second", "third"]);

        // Tick 2: unchanged, no helper invoked
        log.clear();
        assert_eq!(reconciler.tick().await, TickOutcome::Unchanged);
        assert!(log.helpers().is_empty());

        // Tick 3: node added, second helper fails, third never runs
        second.fail_next(1);
        assert_eq!(
            reconciler.tick().await,
            TickOutcome::HelperFailed {
                helper: "second".to_string()
            }
        );
        assert_eq!(log.helpers(), vec!["first", "second"]);
        assert_eq!(log.node_counts(), vec![3, 3]);
        assert_eq!(reconciler.accepted().unwrap().names(), vec!["n1", "n2"]);

        // Tick 4: the whole sequence is retried, including the helper that succeeded
        log.clear();
        assert_eq!(reconciler.tick().await, TickOutcome::Applied { nodes: 3 });
        assert_eq!(log.helpers(), vec!["first", "second", "third"]);
        assert_eq!(reconciler.accepted().unwrap().names(), vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_state() {
        let log = ApplyLog::default();
        let provider = ScriptedProvider::new(vec![
            Ok(snapshot_a()),
            Err(Error::Fetch("api server unavailable".to_string())),
            Ok(snapshot_a()),
        ]);
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        assert!(reconciler.tick().await.is_success());
        log.clear();

        assert_eq!(reconciler.tick().await, TickOutcome::FetchFailed);
        assert!(log.helpers().is_empty());
        assert_eq!(reconciler.accepted().unwrap().len(), 2);

        assert_eq!(reconciler.tick().await, TickOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_empty_cluster_on_first_tick_is_unchanged() {
        let log = ApplyLog::default();
        let provider = ScriptedProvider::new(vec![Ok(Snapshot::default())]);
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        assert_eq!(reconciler.tick().await, TickOutcome::Unchanged);
        assert!(reconciler.accepted().is_none());
        assert!(log.helpers().is_empty());
    }

    #[tokio::test]
    async fn test_first_helper_failure_stops_fan_out() {
        let log = ApplyLog::default();
        let first = RecordingHelper::new("first", &log);
        first.fail_next(1);
        let provider = ScriptedProvider::new(vec![Ok(snapshot_a())]);
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![
                Arc::new(first),
                Arc::new(RecordingHelper::new("second", &log)),
            ],
        );

        assert_eq!(
            reconciler.tick().await,
            TickOutcome::HelperFailed {
                helper: "first".to_string()
            }
        );
        assert_eq!(log.helpers(), vec!["first"]);
        assert!(reconciler.accepted().is_none());
    }

    #[tokio::test]
    async fn test_no_helpers_still_accepts() {
        let provider = ScriptedProvider::new(vec![Ok(snapshot_a())]);
        let mut reconciler = Reconciler::new(Arc::new(provider), Vec::new());

        assert_eq!(reconciler.tick().await, TickOutcome::Applied { nodes: 2 });
        assert!(reconciler.helper_names().is_empty());
        assert!(reconciler.accepted().is_some());
    }
}
