//! Error types for Cairn Core
//!
//! Two families:
//! - [`LoadError`]: per-artifact failures, captured into a `LoadResult`
//! - [`SetupError`]: failures that prevent an orchestrator from being built

use crate::config::ConfigError;
use cairn_scope::ScopeError;
use cairn_store::{FetchError, StoreError};
use std::path::PathBuf;

/// Failure acquiring or injecting a single artifact
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Declared digest does not match the observed bytes
    #[error("checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
        /// True when the bad bytes came from the cache rather than the network
        cached: bool,
    },

    /// Origin unreachable or body unreadable
    #[error("failed to download {artifact}: {source}")]
    DownloadFailed {
        artifact: String,
        #[source]
        source: FetchError,
    },

    /// Cached file exists but cannot be read
    #[error("failed to read cached {artifact}: {source}")]
    CacheUnreadable {
        artifact: String,
        #[source]
        source: StoreError,
    },

    /// Writing or publishing into the cache failed
    #[error("failed to persist {artifact}: {source}")]
    PersistFailed {
        artifact: String,
        #[source]
        source: StoreError,
    },

    /// The strategy could not make the artifact visible to the scope
    #[error("failed to inject {artifact}: {source}")]
    InjectionFailed {
        artifact: String,
        #[source]
        source: ScopeError,
    },
}

impl LoadError {
    /// Coordinates of the artifact the failure belongs to
    #[must_use]
    pub fn artifact(&self) -> &str {
        match self {
            Self::ChecksumMismatch { artifact, .. }
            | Self::DownloadFailed { artifact, .. }
            | Self::CacheUnreadable { artifact, .. }
            | Self::PersistFailed { artifact, .. }
            | Self::InjectionFailed { artifact, .. } => artifact,
        }
    }
}

/// Failure constructing an orchestrator
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The caller's context cannot act as the shared scope
    #[error("unsupported scope source: {0}")]
    UnsupportedScopeSource(#[source] ScopeError),

    /// No injection mechanism is usable on this host
    #[error("no supported injection strategy: {0}")]
    NoSupportedStrategy(#[source] ScopeError),

    /// Cache root could not be prepared
    #[error("cache root {} is unusable: {source}", .path.display())]
    CacheRoot {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ScopeError> for SetupError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::UnsupportedScopeSource(_) => Self::UnsupportedScopeSource(err),
            _ => Self::NoSupportedStrategy(err),
        }
    }
}
