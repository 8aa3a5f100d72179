//! Resumable, cancellable re-embedding migration (§4.5).
//!
//! ```text
//!   idle ──start()──► running ──(all batches done)──► complete
//!     ▲                 │
//!     │                 ├──stop()──► stopping ──► idle
//!     │                 └──error────────────────► idle (error recorded)
//! ```
//!
//! `reset_index` runs immediately at the start of migration, so a crash
//! mid-migration leaves documents intact but the graph gone; `start` is
//! always safe to call again, but re-embeds everything from scratch —
//! there is no resume-from-`last_processed_id` (§9, not adopted).

use crate::document::Document;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::indexer::Indexer;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Progress snapshot returned by [`MigrationController::get_status`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MigrationStatus {
    /// Documents enumerated when the run started.
    pub total: usize,
    /// Documents successfully re-embedded and re-indexed so far.
    pub processed: usize,
    /// Id of the last document in the most recently completed batch.
    pub last_processed_id: Option<String>,
    /// Set once every batch has committed successfully.
    pub is_complete: bool,
    /// Populated if the run ended in failure.
    pub error: Option<String>,
}

/// Drives a batched re-embed-and-rebuild run against a shared [`Indexer`].
pub struct MigrationController {
    indexer: Arc<Indexer>,
    batch_size: usize,
    status: Arc<Mutex<MigrationStatus>>,
    stop_flag: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl MigrationController {
    /// Builds a controller over `indexer`, batching `batch_size` documents
    /// per re-embed call (default 50, §4.5 step 3).
    #[must_use]
    pub fn new(indexer: Arc<Indexer>, batch_size: usize) -> Self {
        Self {
            indexer,
            batch_size,
            status: Arc::new(Mutex::new(MigrationStatus::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a migration to `target_embedder` on the current runtime,
    /// returning immediately. Fails with [`Error::AlreadyRunning`] if a
    /// migration is already in flight; does not touch any state in that
    /// case.
    #[instrument(skip(self, target_embedder))]
    pub fn start(&self, target_embedder: Arc<dyn Embedder>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        *self.status.lock() = MigrationStatus::default();

        let indexer = self.indexer.clone();
        let status = self.status.clone();
        let stop_flag = self.stop_flag.clone();
        let running = self.running.clone();
        let batch_size = self.batch_size;

        tokio::spawn(async move {
            let outcome = Self::run(&indexer, target_embedder.as_ref(), batch_size, &status, &stop_flag).await;
            if let Err(e) = outcome {
                warn!(error = %e, "migration run failed");
                status.lock().error = Some(e.to_string());
            }
            running.store(false, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Signals the running migration to stop at the next batch boundary
    /// (step 3a). A no-op if no migration is running.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Returns a snapshot of the current migration's progress.
    #[must_use]
    pub fn get_status(&self) -> MigrationStatus {
        self.status.lock().clone()
    }

    /// Whether a migration is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(
        indexer: &Indexer,
        target_embedder: &dyn Embedder,
        batch_size: usize,
        status: &Mutex<MigrationStatus>,
        stop_flag: &AtomicBool,
    ) -> Result<()> {
        let docs = indexer.get_all_documents()?;
        status.lock().total = docs.len();

        indexer.reset_index()?;

        for batch in docs.chunks(batch_size.max(1)) {
            if stop_flag.load(Ordering::SeqCst) {
                info!(processed = status.lock().processed, "migration stopped before completion");
                return Ok(());
            }

            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embeddings = target_embedder.embed_batch(&texts).await?;

            let updated: Vec<Document> = batch
                .iter()
                .zip(embeddings)
                .map(|(doc, embedding)| doc.with_embedding(embedding))
                .collect();

            indexer.index_documents(&updated)?;

            let mut guard = status.lock();
            guard.processed += updated.len();
            guard.last_processed_id = updated.last().map(|d| d.id.clone());
            drop(guard);

            tokio::task::yield_now().await;
        }

        if !stop_flag.load(Ordering::SeqCst) {
            status.lock().is_complete = true;
        }
        Ok(())
    }
}
