//! Network fetch settings
//!
//! [`FetchSettings`] bundles the knobs applied to every fetch. A process-wide
//! default is initialized on first use and used whenever a caller supplies
//! none.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("cairn/", env!("CARGO_PKG_VERSION"));

static GLOBAL: Lazy<FetchSettings> = Lazy::new(FetchSettings::default);

/// Timeouts, buffer size and identification for fetches
///
/// Serialized with durations as integer milliseconds
/// (`connect_timeout_ms`, `read_timeout_ms`); missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Time allowed to establish a connection
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,
    /// Time allowed for the response to arrive in full
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,
    /// Chunk size used when reading bodies and cached files
    pub buffer_size: usize,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl FetchSettings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default settings
    #[inline]
    #[must_use]
    pub fn global() -> &'static FetchSettings {
        &GLOBAL
    }

    /// With connect timeout
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// With read timeout
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// With buffer size
    #[inline]
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// With user agent
    #[inline]
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            read_timeout: Duration::from_millis(5000),
            buffer_size: 2048,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
