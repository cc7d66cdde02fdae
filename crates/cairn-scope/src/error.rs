//! Error types for scopes and injection

use crate::scope::ScopeId;
use std::path::PathBuf;

/// Scope binding and injection failures
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// The selected strategy could not make the path visible
    #[error("{strategy} injection of {url} into {scope} failed: {reason}")]
    InjectionFailed {
        /// Name of the strategy that was used
        strategy: &'static str,
        /// Target scope
        scope: ScopeId,
        /// Entry that was being added
        url: String,
        /// Why the scope refused it
        reason: String,
    },

    /// No injection mechanism is usable on this host
    #[error("no supported injection strategy (probed: {})", .probed.join(", "))]
    NoSupportedStrategy {
        /// Names of the strategies that were tried, in order
        probed: Vec<&'static str>,
    },

    /// The caller's execution context cannot be wrapped as the shared scope
    #[error("execution context cannot be bound as a shared scope: {0}")]
    UnsupportedScopeSource(String),

    /// Local path cannot be expressed as a `file://` URL
    #[error("path cannot be expressed as a file url: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl ScopeError {
    /// True for failures that make every future injection fail as well
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoSupportedStrategy { .. } | Self::UnsupportedScopeSource(_)
        )
    }
}
