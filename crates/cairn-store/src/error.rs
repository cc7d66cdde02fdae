//! Error types for the cache and the fetcher

use std::io;
use std::path::PathBuf;

/// Local cache I/O failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Directory could not be created
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// Path being worked on
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Cached file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Path being worked on
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Temporary file could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Path being worked on
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Rename into the final location failed
    #[error("failed to publish {}: {source}", .path.display())]
    Publish {
        /// Path being worked on
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Cache path resolved to something without a parent directory
    #[error("cache path has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
}

impl StoreError {
    /// Path the failed operation was working on
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::CreateDir { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Publish { path, .. }
            | Self::NoParent(path) => path,
        }
    }
}

/// Network transfer failures
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP client could not be configured
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS or timeout failure
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Client failure
        source: reqwest::Error,
    },

    /// Origin answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Body could not be read to the end
    #[error("failed reading body from {url}: {source}")]
    Read {
        /// Requested URL
        url: String,
        /// Underlying I/O failure
        source: io::Error,
    },
}

impl FetchError {
    /// HTTP status, when the origin answered
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
