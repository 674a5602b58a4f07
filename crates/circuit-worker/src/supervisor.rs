// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Single active worker per host

use crate::error::Result;
use crate::host::CircuitWorker;
use crate::options::WorkerOptions;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the host's active worker.
///
/// Spawning through the supervisor terminates the previous worker first.
#[derive(Default)]
pub struct WorkerSupervisor {
    active: Mutex<Option<Arc<CircuitWorker>>>,
}

impl WorkerSupervisor {
    /// Create a supervisor with no active worker
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active worker with a new one
    pub async fn spawn(&self, options: WorkerOptions) -> Result<Arc<CircuitWorker>> {
        self.terminate_active().await;
        let worker = Arc::new(CircuitWorker::spawn(options)?);
        info!("Worker {} is now active", worker.id());
        *self.active.lock() = Some(worker.clone());
        Ok(worker)
    }

    /// The active worker, if any
    pub fn active(&self) -> Option<Arc<CircuitWorker>> {
        self.active.lock().clone()
    }

    /// Kill the active worker, if any
    pub async fn shutdown(&self) {
        self.terminate_active().await;
    }

    async fn terminate_active(&self) {
        let previous = self.active.lock().take();
        if let Some(previous) = previous {
            if let Err(e) = previous.kill().await {
                debug!("Ignoring error while terminating worker {}: {}", previous.id(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use circuit_eval::ScriptedCompiler;

    fn options() -> WorkerOptions {
        WorkerOptions::new(Arc::new(ScriptedCompiler::new().fallback(|_| Ok(()))))
    }

    #[tokio::test]
    async fn test_spawn_replaces_previous() {
        let supervisor = WorkerSupervisor::new();
        let first = supervisor.spawn(options()).await.unwrap();
        let second = supervisor.spawn(options()).await.unwrap();

        assert!(first.is_killed());
        assert!(matches!(first.execute("export {}").await, Err(WorkerError::Killed)));
        assert_eq!(supervisor.active().map(|w| w.id()), Some(second.id()));
        second.execute("export {}").await.unwrap();
    }

    #[tokio::test]
    async fn test_replacing_a_killed_worker() {
        let supervisor = WorkerSupervisor::new();
        let first = supervisor.spawn(options()).await.unwrap();
        first.kill().await.unwrap();

        // The failed second kill is swallowed
        let second = supervisor.spawn(options()).await.unwrap();
        assert!(!second.is_killed());

        supervisor.shutdown().await;
        assert!(second.is_killed());
        assert!(supervisor.active().is_none());
    }
}
