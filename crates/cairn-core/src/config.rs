//! Orchestrator configuration
//!
//! [`CairnConfig`] is plain data: build it in code with the `with_*` methods
//! or load it from TOML. Missing keys take their defaults.
//!
//! ```toml
//! cache_root = "/var/cache/cairn"
//!
//! [fetch]
//! connect_timeout_ms = 2000
//! read_timeout_ms = 10000
//! buffer_size = 8192
//! user_agent = "my-app/1.0"
//! ```

use cairn_store::{FetchSettings, DEFAULT_CACHE_ROOT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Failure loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Content is not valid configuration
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    /// Directory the artifact cache is rooted at
    pub cache_root: PathBuf,
    /// Settings used when a load supplies none
    pub fetch: FetchSettings,
}

impl CairnConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache root
    #[inline]
    #[must_use]
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// With fetch settings
    #[inline]
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchSettings) -> Self {
        self.fetch = fetch;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            fetch: FetchSettings::default(),
        }
    }
}
