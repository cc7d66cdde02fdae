//! Outcome of a single load
//!
//! Loads never unwind on verification or I/O failure; each one yields a
//! [`LoadResult`] so a batch can finish with mixed outcomes.

use crate::error::LoadError;
use cairn_artifact::ArtifactRef;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Terminal stage a load reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    /// Downloaded, verified, persisted and injected
    Fetched,
    /// Read from cache, verified and injected
    Cached,
    ChecksumMismatch,
    DownloadFailed,
    CacheUnreadable,
    PersistFailed,
    InjectionFailed,
}

impl LoadStatus {
    /// Whether the artifact ended up in the scope
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Fetched | Self::Cached)
    }

    fn of(error: &LoadError) -> Self {
        match error {
            LoadError::ChecksumMismatch { .. } => Self::ChecksumMismatch,
            LoadError::DownloadFailed { .. } => Self::DownloadFailed,
            LoadError::CacheUnreadable { .. } => Self::CacheUnreadable,
            LoadError::PersistFailed { .. } => Self::PersistFailed,
            LoadError::InjectionFailed { .. } => Self::InjectionFailed,
        }
    }
}

/// Immutable record of one load
#[derive(Debug, Clone)]
pub struct LoadResult {
    status: LoadStatus,
    artifact: ArtifactRef,
    message: String,
    cause: Option<Arc<LoadError>>,
    path: Option<PathBuf>,
}

impl LoadResult {
    /// Successful load
    #[must_use]
    pub fn success(artifact: ArtifactRef, status: LoadStatus, path: PathBuf) -> Self {
        let message = match status {
            LoadStatus::Cached => format!("loaded {artifact} from cache"),
            _ => format!("loaded {artifact}"),
        };
        Self {
            status,
            artifact,
            message,
            cause: None,
            path: Some(path),
        }
    }

    /// Failed load
    ///
    /// `path` is the local file when acquisition succeeded but injection did not.
    #[must_use]
    pub fn failure(artifact: ArtifactRef, error: LoadError, path: Option<PathBuf>) -> Self {
        Self {
            status: LoadStatus::of(&error),
            message: error.to_string(),
            artifact,
            cause: Some(Arc::new(error)),
            path,
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    /// Human-readable summary
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying failure, if any
    #[inline]
    #[must_use]
    pub fn cause(&self) -> Option<&LoadError> {
        self.cause.as_deref()
    }

    /// Local path of the artifact, when it was acquired
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Display for LoadResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
