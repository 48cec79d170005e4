//! Shared document and background pending sweeper
//!
//! [`SharedDocument`] puts a [`Document`] behind one async mutex so that the
//! network task, the editor task and the sweeper never interleave inside a
//! tree mutation. [`PendingSweeper`] retries parked operations on a fixed
//! interval and whenever a remote operation is admitted.

use crate::document::{Document, EditEvent, Integration};
use crate::crdt::Operation;
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A document shared between tasks
#[derive(Debug, Clone)]
pub struct SharedDocument {
    document: Arc<Mutex<Document>>,
    admitted: Arc<Notify>,
    sweep_interval: Duration,
}

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        let sweep_interval = document.config().sweep_interval();
        Self {
            document: Arc::new(Mutex::new(document)),
            admitted: Arc::new(Notify::new()),
            sweep_interval,
        }
    }

    /// Apply a host editor change; returns the operation to broadcast
    pub async fn apply_local_edit(&self, edit: &EditEvent) -> Result<Option<Operation>> {
        self.document.lock().await.apply_local_edit(edit)
    }

    /// Offer a remote operation, waking the sweeper if it was applied
    pub async fn integrate(&self, operation: Operation) -> Result<Integration> {
        let outcome = self.document.lock().await.integrate_remote(operation)?;
        if outcome == Integration::Applied {
            self.admitted.notify_one();
        }
        Ok(outcome)
    }

    pub async fn text(&self) -> String {
        self.document.lock().await.text()
    }

    pub async fn pending_len(&self) -> usize {
        self.document.lock().await.pending_len()
    }

    /// Run `f` with exclusive access to the document
    pub async fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut document = self.document.lock().await;
        f(&mut document)
    }

    /// Start a background sweeper for this document
    pub fn spawn_sweeper(&self) -> PendingSweeper {
        PendingSweeper::spawn(self.clone(), self.sweep_interval)
    }
}

/// Handle to a running pending-queue sweeper task
#[derive(Debug)]
pub struct PendingSweeper {
    shutdown_tx: broadcast::Sender<()>,
    swept: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl PendingSweeper {
    /// Spawn the sweeper on the current tokio runtime
    pub fn spawn(shared: SharedDocument, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let swept = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&swept);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shared.admitted.notified() => {}
                    _ = shutdown_rx.recv() => break,
                }

                // An apply in progress will sweep on its own; skip this round
                let Ok(mut document) = shared.document.try_lock() else {
                    log::trace!("document busy, skipping sweep");
                    continue;
                };
                if document.pending_len() == 0 {
                    continue;
                }

                let integrated = document.sweep_pending();
                counter.fetch_add(integrated, Ordering::Relaxed);
                if integrated > 0 {
                    log::debug!("background sweep integrated {} operations", integrated);
                }
            }

            log::debug!("pending sweeper stopped");
        });

        Self {
            shutdown_tx,
            swept,
            task,
        }
    }

    /// Total operations this sweeper has integrated
    pub fn swept(&self) -> usize {
        self.swept.load(Ordering::Relaxed)
    }

    /// Ask the sweeper to stop after its current round
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Stop the sweeper and wait for the task to finish
    pub async fn shutdown(self) {
        self.stop();
        if let Err(err) = self.task.await {
            log::warn!("pending sweeper task failed: {}", err);
        }
    }
}
