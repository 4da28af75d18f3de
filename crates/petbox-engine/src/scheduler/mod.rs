//! # Background Workers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Worker loop (both workers)                                            │
//! │                                                                         │
//! │   let (worker, handle) = Worker::new(...);                             │
//! │   tokio::spawn(worker.run());                                          │
//! │                                                                         │
//! │   loop {                                                               │
//! │       select! {                                                        │
//! │           interval.tick()    → one pass, errors logged, retried next   │
//! │           shutdown_rx.recv() → break                                   │
//! │       }                                                                │
//! │   }                                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither worker assumes it is the only runner: the sweep is a single
//! conditional delete and renewals claim a per-cycle marker first.

mod expiry;
mod renewal;

pub use expiry::ExpirySweeper;
pub use renewal::{RenewalReport, RenewalScheduler};

use tokio::sync::mpsc;

use crate::error::{EngineError, EngineResult};

/// Stops a spawned worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerHandle {
    pub(crate) fn new(name: &'static str, shutdown_tx: mpsc::Sender<()>) -> Self {
        WorkerHandle { name, shutdown_tx }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EngineError::Internal(format!("{} shutdown channel closed", self.name)))
    }
}
