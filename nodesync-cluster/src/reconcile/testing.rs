//! Fakes shared by the reconciliation tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use nodesync_core::{Error, NodeHelper, NodeInfo, Result, Snapshot};

use crate::discovery::SnapshotProvider;

pub fn node(name: &str, ip: &str) -> NodeInfo {
    NodeInfo::new(name, ip)
}

/// Provider returning a fixed sequence of fetch results
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Snapshot>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Snapshot>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl SnapshotProvider for ScriptedProvider {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Fetch("script exhausted".to_string())))
    }
}

/// Ordered record of helper applications across helpers
#[derive(Clone, Default)]
pub struct ApplyLog {
    entries: Arc<Mutex<Vec<(String, usize)>>>,
}

impl ApplyLog {
    pub fn helpers(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn node_counts(&self) -> Vec<usize> {
        self.entries.lock().iter().map(|(_, n)| *n).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, helper: &str, nodes: usize) {
        self.entries.lock().push((helper.to_string(), nodes));
    }
}

/// Helper that records every apply and can be told to fail
#[derive(Clone)]
pub struct RecordingHelper {
    name: String,
    log: ApplyLog,
    failures: Arc<AtomicUsize>,
}

impl RecordingHelper {
    pub fn new(name: &str, log: &ApplyLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next `count` applies
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl NodeHelper for RecordingHelper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, snapshot: &Snapshot) -> Result<()> {
        self.log.record(&self.name, snapshot.len());

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Reload(format!("{} exited with status 1", self.name)));
        }
        Ok(())
    }
}
