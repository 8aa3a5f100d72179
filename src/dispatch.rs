//! Single-consumer message dispatch between a caller and one
//! `Indexer`/`MigrationController` pair (§4.6).
//!
//! The indexer is meant to live in an isolated execution context; callers
//! address it by sending a [`DispatchRequest`] with a reply channel
//! instead of holding a reference to the indexer directly. A single task
//! running [`run_dispatch_loop`] drains the request channel serially, so
//! exclusive access to the indexer is structural rather than lock-based
//! (§5).

use crate::document::{Document, NewDocument, SearchHit};
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::indexer::{Indexer, DEFAULT_SEARCH_K};
use crate::migration::{MigrationController, MigrationStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{instrument, warn};

/// One request kind per dispatch verb (`ADD_DOC`, `BATCH_ADD`, `SEARCH`,
/// `GET_ALL`, `CLEAR`, `CONFIGURE`, `MIGRATE_START`, `MIGRATE_STATUS`,
/// `MIGRATE_STOP`).
pub enum Message {
    /// Embed and index a single document.
    AddDoc {
        /// Text and optional metadata to index.
        input: NewDocument,
    },
    /// Embed and index a batch of documents in one embedder call.
    BatchAdd {
        /// Texts and optional metadata to index.
        inputs: Vec<NewDocument>,
    },
    /// Search for the nearest documents to a query.
    Search {
        /// Query text.
        query: String,
        /// Number of results to return.
        k: usize,
        /// Force an exact linear scan instead of the graph traversal.
        use_brute_force: bool,
    },
    /// Fetch every stored document.
    GetAll,
    /// Empty documents, nodes, and meta.
    Clear,
    /// Replace the live embedder.
    Configure {
        /// The embedder to install.
        embedder: Arc<dyn Embedder>,
    },
    /// Start a re-embedding migration.
    MigrateStart {
        /// Embedder the migration re-embeds every document with.
        target_embedder: Arc<dyn Embedder>,
    },
    /// Poll migration progress.
    MigrateStatus,
    /// Request that a running migration stop at the next batch boundary.
    MigrateStop,
}

/// The typed result of handling one [`Message`].
pub enum Reply {
    /// Reply to `AddDoc`.
    Document(Document),
    /// Reply to `BatchAdd`.
    Documents(Vec<Document>),
    /// Reply to `Search`.
    SearchHits(Vec<SearchHit>),
    /// Reply to `GetAll`.
    AllDocuments(Vec<Document>),
    /// Reply to `Clear`, `Configure`, `MigrateStart`, `MigrateStop`.
    Ack,
    /// Reply to `MigrateStatus`.
    Status(MigrationStatus),
}

/// One request on the dispatch channel: a message plus where to send its
/// reply.
pub struct DispatchRequest {
    /// The request payload.
    pub payload: Message,
    /// One-shot channel the handler sends the typed result (or error) on.
    pub reply: oneshot::Sender<Result<Reply>>,
}

/// Sending half of the dispatch channel, what callers outside the
/// indexer's execution context hold.
pub type DispatchSender = mpsc::Sender<DispatchRequest>;

/// Spawns an `mpsc` channel and the dispatch loop task, returning the
/// sending half. The loop owns `indexer` and `migration` for its
/// lifetime; only this task ever calls into them directly.
pub fn spawn_dispatch_loop(indexer: Arc<Indexer>, migration: Arc<MigrationController>) -> DispatchSender {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(run_dispatch_loop(indexer, migration, rx));
    tx
}

/// Drains `rx` serially, dispatching each request to the indexer or
/// migration controller and sending back a typed reply. Runs until the
/// channel closes.
pub async fn run_dispatch_loop(
    indexer: Arc<Indexer>,
    migration: Arc<MigrationController>,
    mut rx: mpsc::Receiver<DispatchRequest>,
) {
    while let Some(request) = rx.recv().await {
        let result = handle(&indexer, &migration, request.payload).await;
        if request.reply.send(result).is_err() {
            warn!("dispatch caller dropped its reply receiver");
        }
    }
}

#[instrument(skip(indexer, migration, message))]
async fn handle(indexer: &Indexer, migration: &MigrationController, message: Message) -> Result<Reply> {
    match message {
        Message::AddDoc { input } => indexer.add_document(input).await.map(Reply::Document),
        Message::BatchAdd { inputs } => indexer.add_documents(inputs).await.map(Reply::Documents),
        Message::Search {
            query,
            k,
            use_brute_force,
        } => {
            let k = if k == 0 { DEFAULT_SEARCH_K } else { k };
            indexer.search(&query, k, use_brute_force).await.map(Reply::SearchHits)
        }
        Message::GetAll => indexer.get_all_documents().map(Reply::AllDocuments),
        Message::Clear => indexer.clear().map(|()| Reply::Ack),
        Message::Configure { embedder } => {
            indexer.set_embedder(embedder);
            Ok(Reply::Ack)
        }
        Message::MigrateStart { target_embedder } => migration.start(target_embedder).map(|()| Reply::Ack),
        Message::MigrateStatus => Ok(Reply::Status(migration.get_status())),
        Message::MigrateStop => {
            migration.stop();
            Ok(Reply::Ack)
        }
    }
}

/// Decodes a wire-level `{type, payload}` request into a typed
/// [`Message`]. Only `Configure`'s embedder field cannot come off the
/// wire (it requires a live `Arc<dyn Embedder>`), so wire-decoded
/// `Configure` is handled by callers that build the embedder themselves
/// from an [`AppConfig`] before constructing the message.
///
/// Unknown `kind` values surface [`Error::UnknownRequest`], mirroring the
/// wire-decoded boundary a front end like a UI worker would sit behind
/// (§4.6); the typed Rust `Message` enum above is otherwise exhaustive
/// and cannot represent an unknown discriminant.
pub fn unknown_request_kind(kind: &str) -> Error {
    Error::UnknownRequest(kind.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::MockEmbedder;
    use crate::hnsw::HnswParams;

    async fn spawn_test_loop() -> (tempfile::TempDir, DispatchSender) {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Arc::new(
            Indexer::init(dir.path(), HnswParams::default(), Arc::new(MockEmbedder::new(16))).unwrap(),
        );
        let migration = Arc::new(MigrationController::new(indexer.clone(), 10));
        let tx = spawn_dispatch_loop(indexer, migration);
        (dir, tx)
    }

    async fn send(tx: &DispatchSender, payload: Message) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(DispatchRequest { payload, reply: reply_tx }).await.unwrap();
        reply_rx.await.unwrap()
    }

    #[tokio::test]
    async fn add_doc_then_search_round_trips_through_the_loop() {
        let (_dir, tx) = spawn_test_loop().await;

        let add_reply = send(
            &tx,
            Message::AddDoc {
                input: NewDocument::text_only("hello dispatch"),
            },
        )
        .await
        .unwrap();
        let Reply::Document(doc) = add_reply else {
            panic!("expected Document reply");
        };

        let search_reply = send(
            &tx,
            Message::Search {
                query: "hello dispatch".to_string(),
                k: 1,
                use_brute_force: false,
            },
        )
        .await
        .unwrap();
        let Reply::SearchHits(hits) = search_reply else {
            panic!("expected SearchHits reply");
        };
        assert_eq!(hits[0].document.id, doc.id);
    }

    #[tokio::test]
    async fn migrate_status_before_any_run_is_all_zero() {
        let (_dir, tx) = spawn_test_loop().await;
        let reply = send(&tx, Message::MigrateStatus).await.unwrap();
        let Reply::Status(status) = reply else {
            panic!("expected Status reply");
        };
        assert_eq!(status.total, 0);
        assert!(!status.is_complete);
    }

    #[tokio::test]
    async fn clear_empties_the_indexer() {
        let (_dir, tx) = spawn_test_loop().await;
        send(
            &tx,
            Message::AddDoc {
                input: NewDocument::text_only("x"),
            },
        )
        .await
        .unwrap();

        send(&tx, Message::Clear).await.unwrap();

        let reply = send(&tx, Message::GetAll).await.unwrap();
        let Reply::AllDocuments(docs) = reply else {
            panic!("expected AllDocuments reply");
        };
        assert!(docs.is_empty());
    }

    #[test]
    fn unknown_request_kind_carries_the_offending_string() {
        let err = unknown_request_kind("FROBNICATE");
        assert!(matches!(err, Error::UnknownRequest(k) if k == "FROBNICATE"));
    }
}
