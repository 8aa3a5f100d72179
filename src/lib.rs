//! # vectoria-core
//!
//! A persistent approximate-nearest-neighbor vector index built on a
//! Hierarchical Navigable Small World graph, with granular incremental
//! persistence and a resumable re-embedding migration controller.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vectoria_core::{Indexer, HnswParams, MockEmbedder, NewDocument};
//!
//! # async fn run() -> vectoria_core::Result<()> {
//! let indexer = Indexer::init("./data", HnswParams::default(), Arc::new(MockEmbedder::new(384)))?;
//! indexer.add_document(NewDocument::text_only("hello world")).await?;
//! let hits = indexer.search("hello world", 5, false).await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dispatch;
pub mod distance;
pub mod document;
pub mod embedder;
pub mod error;
pub mod hnsw;
pub mod indexer;
pub mod migration;
pub mod store;

pub use config::AppConfig;
pub use document::{Document, NewDocument, SearchHit};
pub use embedder::{Embedder, InferenceBackend, LocalEmbedder, MockEmbedder, OpenAiEmbedder};
pub use error::{Error, Result};
pub use hnsw::{Graph, GraphNode, HnswParams};
pub use indexer::Indexer;
pub use migration::{MigrationController, MigrationStatus};
