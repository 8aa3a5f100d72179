//! Error types for `vectoria-core`.
//!
//! A single enum covers every failure the public API can surface. Error
//! codes follow the pattern `VTX-0XX` so they can be grepped out of logs.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the indexer, graph, persistence, and migration layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Graph insert with an id that is already present (VTX-001).
    #[error("[VTX-001] duplicate document id '{0}'")]
    DuplicateId(String),

    /// `Embedder::embed` or `embed_batch` failed (VTX-002).
    #[error("[VTX-002] embedder failure: {0}")]
    EmbedderFailure(String),

    /// A second migration was started while one was already running (VTX-003).
    #[error("[VTX-003] migration is already running")]
    AlreadyRunning,

    /// The dispatch loop received a message it does not recognize (VTX-004).
    #[error("[VTX-004] unknown request type '{0}'")]
    UnknownRequest(String),

    /// A `sled` transaction aborted (VTX-005).
    #[error("[VTX-005] persistence failure: {0}")]
    PersistenceFailure(String),

    /// Inserted vector length does not match the index's recorded dimension (VTX-006).
    #[error("[VTX-006] dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension recorded at the first insert.
        expected: usize,
        /// Dimension of the vector that was rejected.
        actual: usize,
    },

    /// Invalid or conflicting configuration (VTX-007).
    #[error("[VTX-007] configuration error: {0}")]
    Config(String),

    /// Filesystem I/O failure (VTX-008).
    #[error("[VTX-008] io error: {0}")]
    Io(#[from] std::io::Error),

    /// `bincode` (de)serialization failure (VTX-009).
    #[error("[VTX-009] serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns the stable error code, e.g. `"VTX-001"`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "VTX-001",
            Self::EmbedderFailure(_) => "VTX-002",
            Self::AlreadyRunning => "VTX-003",
            Self::UnknownRequest(_) => "VTX-004",
            Self::PersistenceFailure(_) => "VTX-005",
            Self::DimensionMismatch { .. } => "VTX-006",
            Self::Config(_) => "VTX-007",
            Self::Io(_) => "VTX-008",
            Self::Serialization(_) => "VTX-009",
        }
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}

impl From<sled::transaction::TransactionError<sled::Error>> for Error {
    fn from(err: sled::transaction::TransactionError<sled::Error>) -> Self {
        Self::PersistenceFailure(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::DuplicateId("x".into()).code(), "VTX-001");
        assert_eq!(Error::AlreadyRunning.code(), "VTX-003");
        assert_eq!(
            Error::DimensionMismatch {
                expected: 3,
                actual: 4
            }
            .code(),
            "VTX-006"
        );
    }
}
