//! Orchestrates embedder, graph, and persistence behind a small façade
//! (§4.4): `init`, `add_document`, `add_documents`, `index_documents`,
//! `search`, `get_all_documents`, `clear`, `reset_index`.

use crate::config::AppConfig;
use crate::distance::cosine_similarity;
use crate::document::{Document, NewDocument, SearchHit};
use crate::embedder::Embedder;
use crate::error::Result;
use crate::hnsw::{Graph, HnswParams};
use crate::store::{DocumentStore, IndexMeta, MetaStore, NodeStore};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default `k` for [`Indexer::search`] when the caller doesn't specify one.
pub const DEFAULT_SEARCH_K: usize = 5;

/// The indexing façade: one `sled::Db`, one in-memory graph, one embedder.
pub struct Indexer {
    db: sled::Db,
    documents: DocumentStore,
    nodes: NodeStore,
    meta: MetaStore,
    graph: RwLock<Graph>,
    embedder: RwLock<Arc<dyn Embedder>>,
}

impl Indexer {
    /// Opens (creating if absent) the `sled` database at `data_dir` and
    /// loads persisted graph state, per the load protocol of §4.3.
    ///
    /// Idempotent: calling `init` again on the same directory just
    /// re-reads the same state.
    #[instrument(skip(embedder), fields(data_dir = %data_dir.as_ref().display()))]
    pub fn init(data_dir: impl AsRef<Path>, params: HnswParams, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let db = sled::open(data_dir.as_ref())?;
        let documents = DocumentStore::open(&db)?;
        let nodes = NodeStore::open(&db)?;
        let meta = MetaStore::open(&db)?;

        let graph = match meta.read()? {
            Some(stored) => {
                debug!(node_count = %nodes.load_all()?.len(), "restoring persisted graph");
                let restored_params = HnswParams::new(stored.m, stored.ef_construction, stored.ef_search);
                Graph::from_parts(
                    restored_params,
                    nodes.load_all()?,
                    stored.entry_point_id,
                    stored.max_level,
                    stored.dimension,
                )
            }
            None => Graph::new(params),
        };

        Ok(Self {
            db,
            documents,
            nodes,
            meta,
            graph: RwLock::new(graph),
            embedder: RwLock::new(embedder),
        })
    }

    /// Opens an indexer from a fully-resolved [`AppConfig`], constructing
    /// the embedder named by `embedder.kind`. `openai`/`local` embedders
    /// that need a caller-supplied backend are left to the caller to wire
    /// up directly via [`Indexer::init`]; this convenience path only
    /// covers the self-contained kinds (`mock`, `openai`).
    pub fn init_with_config(config: &AppConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match config.embedder.kind {
            crate::config::EmbedderKind::Openai => Arc::new(crate::embedder::OpenAiEmbedder::new(
                config.embedder.openai.api_key.clone(),
                config.embedder.openai.endpoint.clone(),
                config.embedder.openai.model_name.clone(),
            )),
            crate::config::EmbedderKind::Mock => Arc::new(crate::embedder::MockEmbedder::new(384)),
            crate::config::EmbedderKind::Local => {
                return Err(crate::error::Error::Config(
                    "embedder.kind = \"local\" requires a caller-supplied InferenceBackend; \
                     construct a LocalEmbedder and call Indexer::init directly"
                        .to_string(),
                ));
            }
        };
        Self::init(&config.storage.data_dir, config.hnsw.to_params(), embedder)
    }

    /// Replaces the live embedder, per `CONFIGURE` (§4.6). Does not touch
    /// the graph or stores; future adds/searches use the new embedder.
    pub fn set_embedder(&self, embedder: Arc<dyn Embedder>) {
        *self.embedder.write() = embedder;
    }

    fn current_embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.read().clone()
    }

    /// Persists the graph's current scalar state under the well-known
    /// meta key, after the node transaction(s) commit (§4.3).
    fn persist_meta(&self, graph: &Graph) -> Result<()> {
        self.meta.write(&IndexMeta {
            m: graph.params.m,
            ef_construction: graph.params.ef_construction,
            ef_search: graph.params.ef_search,
            level_multiplier: graph.params.level_multiplier,
            max_level: graph.max_level(),
            entry_point_id: graph.entry_point_id(),
            dimension: graph.dimension(),
        })
    }

    /// Embeds, inserts into the graph, and durably persists one document.
    #[instrument(skip(self, input))]
    pub async fn add_document(&self, input: NewDocument) -> Result<Document> {
        let embedding = self.current_embedder().embed(&input.text).await?;
        let doc = Document::new(input.text, input.metadata, embedding);

        let graph = self.graph.write();
        let touched = graph.insert(doc.id.clone(), doc.embedding.clone())?;
        let touched_nodes: Vec<_> = touched.iter().filter_map(|id| graph.get_node(id)).collect();
        self.nodes.write_touched(&touched_nodes)?;
        self.persist_meta(&graph)?;
        drop(graph);

        self.documents.put(&doc)?;
        Ok(doc)
    }

    /// Embeds the whole batch in one embedder call, then inserts and
    /// persists every document, combining the touched-node sets (§4.4).
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn add_documents(&self, inputs: Vec<NewDocument>) -> Result<Vec<Document>> {
        let texts: Vec<String> = inputs.iter().map(|i| i.text.clone()).collect();
        let embeddings = self.current_embedder().embed_batch(&texts).await?;

        let docs: Vec<Document> = inputs
            .into_iter()
            .zip(embeddings)
            .map(|(input, embedding)| Document::new(input.text, input.metadata, embedding))
            .collect();

        self.insert_embedded_batch(&docs)?;
        self.documents.put_all(&docs)?;
        Ok(docs)
    }

    /// Inserts already-embedded documents, preserving ids and timestamps
    /// (§4.4 `indexDocuments`). Used by the migration controller.
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    pub fn index_documents(&self, docs: &[Document]) -> Result<()> {
        self.insert_embedded_batch(docs)?;
        self.documents.put_all(docs)?;
        Ok(())
    }

    fn insert_embedded_batch(&self, docs: &[Document]) -> Result<()> {
        let graph = self.graph.write();
        let mut all_touched = Vec::new();
        for doc in docs {
            let touched = graph.insert(doc.id.clone(), doc.embedding.clone())?;
            all_touched.extend(touched);
        }
        all_touched.sort();
        all_touched.dedup();
        let touched_nodes: Vec<_> = all_touched.iter().filter_map(|id| graph.get_node(id)).collect();
        self.nodes.write_touched(&touched_nodes)?;
        self.persist_meta(&graph)?;
        Ok(())
    }

    /// Searches for the `k` nearest documents to `query_text` (§4.4).
    ///
    /// `use_brute_force` forces an exact linear scan over every stored
    /// document instead of the approximate graph traversal.
    #[instrument(skip(self, query_text))]
    pub async fn search(&self, query_text: &str, k: usize, use_brute_force: bool) -> Result<Vec<SearchHit>> {
        let query = self.current_embedder().embed(query_text).await?;

        let scored: Vec<(String, f32)> = if use_brute_force {
            self.brute_force_search(&query, k)?
        } else {
            self.graph.read().search(&query, k)
        };

        let ids: Vec<String> = scored.iter().map(|(id, _)| id.clone()).collect();
        let docs = self.documents.get_many(&ids)?;

        let mut by_id: std::collections::HashMap<String, Document> =
            docs.into_iter().map(|d| (d.id.clone(), d)).collect();

        let mut hits = Vec::with_capacity(scored.len());
        for (id, score) in scored {
            match by_id.remove(&id) {
                Some(document) => hits.push(SearchHit { document, score }),
                None => warn!(node_id = %id, "ghost node: search result has no backing document, skipping"),
            }
        }
        Ok(hits)
    }

    fn brute_force_search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let mut scored: Vec<(String, f32)> = self
            .documents
            .all()?
            .into_iter()
            .map(|doc| {
                let score = cosine_similarity(query, &doc.embedding);
                (doc.id, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    /// Returns every stored document, order unspecified.
    pub fn get_all_documents(&self) -> Result<Vec<Document>> {
        self.documents.all()
    }

    /// Empties documents, nodes, and meta.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        self.documents.clear()?;
        self.nodes.clear()?;
        self.meta.clear()?;
        let params = self.graph.read().params;
        *self.graph.write() = Graph::new(params);
        Ok(())
    }

    /// Empties the graph and its metadata, preserving documents. The
    /// primitive migration uses to drop the old graph before re-embedding
    /// (§4.3, §4.5).
    #[instrument(skip(self))]
    pub fn reset_index(&self) -> Result<()> {
        self.nodes.clear()?;
        self.meta.clear()?;
        let params = self.graph.read().params;
        *self.graph.write() = Graph::new(params);
        Ok(())
    }

    /// The underlying `sled::Db`, exposed for callers that need direct
    /// access (e.g. the migration controller, which shares this indexer).
    #[must_use]
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::MockEmbedder;
    use std::sync::Arc;

    fn open_indexer() -> (tempfile::TempDir, Indexer) {
        let dir = tempfile::tempdir().unwrap();
        let indexer = Indexer::init(dir.path(), HnswParams::default(), Arc::new(MockEmbedder::new(16))).unwrap();
        (dir, indexer)
    }

    #[test]
    fn init_with_config_rejects_local_embedder_kind() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_toml(&format!(
            "[embedder]\nkind = \"local\"\n[storage]\ndata_dir = \"{}\"\n",
            dir.path().display()
        ))
        .unwrap();

        let err = Indexer::init_with_config(&config).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[tokio::test]
    async fn add_then_search_finds_the_document() {
        let (_dir, indexer) = open_indexer();
        let doc = indexer
            .add_document(NewDocument::text_only("the capital of france is paris"))
            .await
            .unwrap();

        let hits = indexer
            .search("the capital of france is paris", 1, false)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, doc.id);
        assert!(hits[0].score > 0.9);
    }

    #[tokio::test]
    async fn add_documents_embeds_as_one_batch_and_persists_all() {
        let (_dir, indexer) = open_indexer();
        let docs = indexer
            .add_documents(vec![
                NewDocument::text_only("alpha"),
                NewDocument::text_only("beta"),
                NewDocument::text_only("gamma"),
            ])
            .await
            .unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(indexer.get_all_documents().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn duplicate_text_yields_distinct_ids() {
        let (_dir, indexer) = open_indexer();
        let a = indexer.add_document(NewDocument::text_only("same text")).await.unwrap();
        let b = indexer.add_document(NewDocument::text_only("same text")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn brute_force_search_matches_cosine_ranking() {
        let (_dir, indexer) = open_indexer();
        indexer.add_document(NewDocument::text_only("one")).await.unwrap();
        indexer.add_document(NewDocument::text_only("two")).await.unwrap();

        let hits = indexer.search("one", 5, true).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn clear_empties_everything() {
        let (_dir, indexer) = open_indexer();
        indexer.add_document(NewDocument::text_only("x")).await.unwrap();
        indexer.clear().unwrap();
        assert!(indexer.get_all_documents().unwrap().is_empty());
        assert!(indexer.search("x", 5, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_index_preserves_documents_but_empties_the_graph() {
        let (_dir, indexer) = open_indexer();
        indexer.add_document(NewDocument::text_only("x")).await.unwrap();
        indexer.reset_index().unwrap();

        assert_eq!(indexer.get_all_documents().unwrap().len(), 1);
        assert!(indexer.search("x", 5, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopening_an_existing_directory_restores_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let indexer = Indexer::init(dir.path(), HnswParams::default(), Arc::new(MockEmbedder::new(16))).unwrap();
            indexer.add_document(NewDocument::text_only("persisted")).await.unwrap().id
        };

        let reopened = Indexer::init(dir.path(), HnswParams::default(), Arc::new(MockEmbedder::new(16))).unwrap();
        let hits = reopened.search("persisted", 1, false).await.unwrap();
        assert_eq!(hits[0].document.id, id);
    }

    #[tokio::test]
    async fn empty_index_search_returns_nothing() {
        let (_dir, indexer) = open_indexer();
        assert!(indexer.search("anything", 5, false).await.unwrap().is_empty());
    }
}
