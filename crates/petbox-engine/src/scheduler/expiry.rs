//! Draft expiry sweeper.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use petbox_db::Database;

use super::WorkerHandle;
use crate::error::EngineResult;

/// Deletes open drafts past their expiry on a fixed interval.
pub struct ExpirySweeper {
    db: Database,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ExpirySweeper {
    /// Creates a sweeper and the handle that stops it.
    pub fn new(db: Database, interval: Duration) -> (Self, WorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let sweeper = ExpirySweeper {
            db,
            interval,
            shutdown_rx,
        };

        (sweeper, WorkerHandle::new("expiry-sweeper", shutdown_tx))
    }

    /// Runs the sweep loop. The first sweep happens immediately.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Expiry sweeper starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_at(Utc::now()).await {
                        error!(?e, "Draft sweep failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Expiry sweeper shutting down");
                    break;
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// Deletes drafts still open and expired before `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let deleted = self.db.drafts().delete_expired(now).await?;

        if deleted > 0 {
            info!(deleted, "Expired drafts deleted");
        } else {
            debug!("No expired drafts");
        }

        Ok(deleted)
    }
}
