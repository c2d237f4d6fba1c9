//! Tick scheduler
//!
//! Ticks are awaited inline, so they never overlap. Cancellation is only
//! observed while waiting for the next tick: a tick that has started always
//! runs to completion.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::reconciler::Reconciler;
use super::schedule::Schedule;

pub struct Scheduler {
    schedule: Schedule,
    run_on_start: bool,
    cancel_token: CancellationToken,
}

impl Scheduler {
    #[must_use]
    pub const fn new(schedule: Schedule, cancel_token: CancellationToken) -> Self {
        Self {
            schedule,
            run_on_start: false,
            cancel_token,
        }
    }

    /// Fire the first tick immediately instead of at the first scheduled time
    #[must_use]
    pub const fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    /// Drive `reconciler` until cancelled. Returns the number of ticks run.
    pub async fn run(&self, reconciler: &mut Reconciler) -> usize {
        tracing::info!(
            schedule = %self.schedule,
            run_on_start = self.run_on_start,
            helpers = ?reconciler.helper_names(),
            "Reconciliation scheduler started"
        );

        let mut ticks = 0;

        if self.run_on_start && !self.cancel_token.is_cancelled() {
            reconciler.tick().await;
            ticks += 1;
        }

        loop {
            if self.cancel_token.is_cancelled() {
                break;
            }

            let Some(delay) = self.schedule.next_delay(Utc::now()) else {
                tracing::warn!(schedule = %self.schedule, "Schedule has no upcoming ticks");
                break;
            };

            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            reconciler.tick().await;
            ticks += 1;
        }

        tracing::info!(ticks, "Reconciliation scheduler stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SnapshotProvider;
    use crate::reconcile::testing::{node, ApplyLog, RecordingHelper};
    use async_trait::async_trait;
    use nodesync_core::{Result, Snapshot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Reports one more node on every fetch and cancels on the given fetch
    struct GrowingProvider {
        fetches: AtomicUsize,
        cancel_on: usize,
        cancel_token: CancellationToken,
    }

    #[async_trait]
    impl SnapshotProvider for GrowingProvider {
        async fn fetch_snapshot(&self) -> Result<Snapshot> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.cancel_on {
                self.cancel_token.cancel();
            }
            let nodes = (0..n)
                .map(|i| node(&format!("n{i}"), &format!("10.0.0.{i}")))
                .collect();
            Ok(Snapshot::new(nodes))
        }
    }

    fn every(ms: u64) -> Schedule {
        Schedule::Every(Duration::from_millis(ms))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_preempt_running_tick() {
        let cancel_token = CancellationToken::new();
        let log = ApplyLog::default();
        let provider = GrowingProvider {
            fetches: AtomicUsize::new(0),
            cancel_on: 3,
            cancel_token: cancel_token.clone(),
        };
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        let ticks = Scheduler::new(every(50), cancel_token)
            .run(&mut reconciler)
            .await;

        assert_eq!(ticks, 3);
        // The tick that observed cancellation still applied its snapshot
        assert_eq!(log.node_counts(), vec![1, 2, 3]);
        assert_eq!(reconciler.accepted().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_start_ticks_immediately() {
        let cancel_token = CancellationToken::new();
        let log = ApplyLog::default();
        let provider = GrowingProvider {
            fetches: AtomicUsize::new(0),
            cancel_on: 1,
            cancel_token: cancel_token.clone(),
        };
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        let started = tokio::time::Instant::now();
        let ticks = Scheduler::new(every(60_000), cancel_token)
            .run_on_start(true)
            .run(&mut reconciler)
            .await;

        assert_eq!(ticks, 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_runs_nothing() {
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let log = ApplyLog::default();
        let provider = GrowingProvider {
            fetches: AtomicUsize::new(0),
            cancel_on: usize::MAX,
            cancel_token: cancel_token.clone(),
        };
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        let ticks = Scheduler::new(every(10), cancel_token)
            .run_on_start(true)
            .run(&mut reconciler)
            .await;

        assert_eq!(ticks, 0);
        assert!(log.helpers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_idle_stops_loop() {
        let cancel_token = CancellationToken::new();
        let log = ApplyLog::default();
        let provider = GrowingProvider {
            fetches: AtomicUsize::new(0),
            cancel_on: usize::MAX,
            cancel_token: cancel_token.clone(),
        };
        let mut reconciler = Reconciler::new(
            Arc::new(provider),
            vec![Arc::new(RecordingHelper::new("only", &log))],
        );

        let canceller = cancel_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            canceller.cancel();
        });

        let ticks = Scheduler::new(every(100), cancel_token)
            .run(&mut reconciler)
            .await;

        // Ticks at 100ms and 200ms, cancelled while waiting for 300ms
        assert_eq!(ticks, 2);
        assert_eq!(log.node_counts(), vec![1, 2]);
    }
}
