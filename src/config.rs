//! Layered configuration via `figment` (§6).
//!
//! Priority (highest to lowest): runtime overrides, `VECTORIA_*` environment
//! variables, `vectoria.toml`, built-in defaults.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default config file name looked up by [`AppConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "vectoria.toml";

/// Configuration errors, distinct from the runtime [`crate::error::Error`]
/// taxonomy since they can occur before an `Indexer` exists.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `figment` failed to merge or deserialize a layer.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configured value is present but semantically invalid.
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Dotted config key, e.g. `"hnsw.m"`.
        key: String,
        /// What's wrong with it.
        message: String,
    },
}

/// Which embedder family to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// In-process inference via a caller-supplied `InferenceBackend`.
    Local,
    /// OpenAI-compatible HTTP embeddings endpoint.
    Openai,
    /// Deterministic hash-based embedder, the default so the crate is
    /// usable with zero external configuration.
    #[default]
    Mock,
}

/// `embedder.local.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalEmbedderConfig {
    /// Identifier of the model the caller's `InferenceBackend` should load.
    pub model_name: String,
}

impl Default for LocalEmbedderConfig {
    fn default() -> Self {
        Self {
            model_name: "local-default".to_string(),
        }
    }
}

/// `embedder.openai.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiEmbedderConfig {
    /// Bearer credential. Empty by default; must be set before use.
    pub api_key: String,
    /// Base URL, defaults to `https://api.openai.com/v1`.
    pub endpoint: String,
    /// Model identifier, defaults to `text-embedding-3-small`.
    pub model_name: String,
}

impl Default for OpenAiEmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: crate::embedder::DEFAULT_ENDPOINT.to_string(),
            model_name: crate::embedder::DEFAULT_MODEL.to_string(),
        }
    }
}

/// `embedder.*`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Which family to construct.
    pub kind: EmbedderKind,
    /// Settings for `kind = "local"`.
    pub local: LocalEmbedderConfig,
    /// Settings for `kind = "openai"`.
    pub openai: OpenAiEmbedderConfig,
}

/// `hnsw.*`, overriding [`crate::hnsw::HnswParams::default`] selectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Target out-degree per node per layer.
    pub m: usize,
    /// Beam width used while inserting.
    pub ef_construction: usize,
    /// Beam width used while searching.
    pub ef_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let defaults = crate::hnsw::HnswParams::default();
        Self {
            m: defaults.m,
            ef_construction: defaults.ef_construction,
            ef_search: defaults.ef_search,
        }
    }
}

impl HnswConfig {
    /// Converts this config section into runtime graph parameters.
    #[must_use]
    pub fn to_params(&self) -> crate::hnsw::HnswParams {
        crate::hnsw::HnswParams::new(self.m, self.ef_construction, self.ef_search)
    }
}

/// `storage.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory the `sled` database lives in.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./vectoria_data".to_string(),
        }
    }
}

/// `migration.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Documents re-embedded per batch (§4.5 step 3).
    pub batch_size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

/// Top-level configuration, the `Configure` request's payload shape (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Embedder selection and per-family settings.
    pub embedder: EmbedderConfig,
    /// Graph construction/search parameters.
    pub hnsw: HnswConfig,
    /// Where the `sled` database lives.
    pub storage: StorageConfig,
    /// Migration batching.
    pub migration: MigrationConfig,
}

impl AppConfig {
    /// Loads configuration from `vectoria.toml` in the current directory,
    /// if present, layered under defaults and over `VECTORIA_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Loads configuration from an explicit file path. A missing file is
    /// not an error — it simply contributes nothing to the merge.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("VECTORIA_").split("_").lowercase(false));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from an in-memory TOML string, used by tests.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations that would fail later in a more confusing way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hnsw.m == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hnsw.m".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.embedder.kind == EmbedderKind::Openai && self.embedder.openai.api_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "embedder.openai.api_key".to_string(),
                message: "required when embedder.kind = \"openai\"".to_string(),
            });
        }
        if self.migration.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "migration.batch_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
