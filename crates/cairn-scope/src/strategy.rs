//! Injection strategies
//!
//! Provides the [`InjectionStrategy`] trait and the two mechanisms for
//! appending a path to a [`Scope`]. Strategies are probed in preference order
//! against the host's [`HostCapabilities`]; the first supported one wins.

use crate::error::ScopeError;
use crate::scope::Scope;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Environment variable that disables [`StructuredInjection`] when set
pub const DISABLE_STRUCTURED_ENV: &str = "CAIRN_DISABLE_STRUCTURED_INJECTION";

/// Environment variable that disables [`TableInjection`] when set
pub const DISABLE_TABLE_ENV: &str = "CAIRN_DISABLE_TABLE_INJECTION";

static PROCESS_STRATEGY: Lazy<Option<Arc<dyn InjectionStrategy>>> = Lazy::new(|| {
    let caps = HostCapabilities::detect();
    match select_strategy(&default_strategies(), &caps) {
        Ok(strategy) => {
            tracing::debug!(strategy = strategy.name(), "selected injection strategy");
            Some(strategy)
        }
        Err(err) => {
            tracing::error!(error = %err, "no injection strategy available");
            None
        }
    }
});

/// What the host lets this process do to scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Scopes' own append operation may be invoked
    pub structured_access: bool,

    /// Scopes' raw tables may be written directly
    pub table_access: bool,
}

impl HostCapabilities {
    /// Everything permitted
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self {
            structured_access: true,
            table_access: true,
        }
    }

    /// Nothing permitted
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        Self {
            structured_access: false,
            table_access: false,
        }
    }

    /// Probe the running process
    ///
    /// Every capability is available unless its disable variable is set to a
    /// non-empty value other than `0` or `false`.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            structured_access: !env_flag(DISABLE_STRUCTURED_ENV),
            table_access: !env_flag(DISABLE_TABLE_ENV),
        }
    }

    /// Override structured access
    #[inline]
    #[must_use]
    pub const fn with_structured_access(mut self, allowed: bool) -> Self {
        self.structured_access = allowed;
        self
    }

    /// Override table access
    #[inline]
    #[must_use]
    pub const fn with_table_access(mut self, allowed: bool) -> Self {
        self.table_access = allowed;
        self
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| {
        let value = value.trim();
        !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
    })
}

/// Mechanism for making a path resolvable inside a scope
///
/// Implementations must be safe to call concurrently on the same scope.
pub trait InjectionStrategy: Send + Sync + std::fmt::Debug {
    /// Strategy name (for logging and errors)
    fn name(&self) -> &'static str;

    /// Whether the host permits this strategy
    fn is_supported(&self, caps: &HostCapabilities) -> bool;

    /// Append `url` to `scope`
    ///
    /// # Errors
    /// Returns [`ScopeError::InjectionFailed`] if the scope refuses the entry
    fn inject(&self, scope: &Scope, url: &Url) -> Result<(), ScopeError>;

    /// Append a local file to `scope`, returning the `file://` URL used
    ///
    /// Relative paths are resolved against the current directory.
    ///
    /// # Errors
    /// Returns error if the path has no URL form or injection fails
    fn inject_path(&self, scope: &Scope, path: &Path) -> Result<Url, ScopeError> {
        let url = file_url(path)?;
        self.inject(scope, &url)?;
        Ok(url)
    }
}

fn file_url(path: &Path) -> Result<Url, ScopeError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| ScopeError::InvalidPath(path.to_path_buf()))?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|()| ScopeError::InvalidPath(absolute))
}

/// Goes through the scope's own append operation
///
/// Preferred: keeps the scope's bookkeeping consistent. Fails on sealed scopes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredInjection;

impl InjectionStrategy for StructuredInjection {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn is_supported(&self, caps: &HostCapabilities) -> bool {
        caps.structured_access
    }

    fn inject(&self, scope: &Scope, url: &Url) -> Result<(), ScopeError> {
        scope.append(url.clone())?;
        tracing::trace!(scope = %scope.id(), url = %url, "appended through scope");
        Ok(())
    }
}

/// Writes the scope's search path and unopened queue directly
///
/// Fallback for hosts where the structured operation is unavailable. Both
/// tables are updated while the unopened queue is locked, so a concurrent
/// lookup never sees one without the other.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableInjection;

impl InjectionStrategy for TableInjection {
    fn name(&self) -> &'static str {
        "table"
    }

    fn is_supported(&self, caps: &HostCapabilities) -> bool {
        caps.table_access
    }

    fn inject(&self, scope: &Scope, url: &Url) -> Result<(), ScopeError> {
        let tables = scope.tables();
        let mut unopened = tables.unopened.lock();
        tables.search_path.write().push(url.clone());
        unopened.push_back(url.clone());
        tracing::trace!(scope = %scope.id(), url = %url, "wrote scope tables");
        Ok(())
    }
}

/// Strategies in preference order
#[must_use]
pub fn default_strategies() -> Vec<Arc<dyn InjectionStrategy>> {
    vec![Arc::new(StructuredInjection), Arc::new(TableInjection)]
}

/// First strategy in `candidates` that `caps` supports
///
/// # Errors
/// Returns [`ScopeError::NoSupportedStrategy`] naming every probed strategy
pub fn select_strategy(
    candidates: &[Arc<dyn InjectionStrategy>],
    caps: &HostCapabilities,
) -> Result<Arc<dyn InjectionStrategy>, ScopeError> {
    candidates
        .iter()
        .find(|strategy| strategy.is_supported(caps))
        .cloned()
        .ok_or_else(|| ScopeError::NoSupportedStrategy {
            probed: candidates.iter().map(|strategy| strategy.name()).collect(),
        })
}

/// Strategy selected for this process
///
/// Probed once on first use; later calls return the same strategy or the same
/// failure.
///
/// # Errors
/// Returns [`ScopeError::NoSupportedStrategy`] if the host permits none
pub fn process_strategy() -> Result<Arc<dyn InjectionStrategy>, ScopeError> {
    let selected: &Option<Arc<dyn InjectionStrategy>> = &PROCESS_STRATEGY;
    selected
        .clone()
        .ok_or_else(|| ScopeError::NoSupportedStrategy {
            probed: default_strategies()
                .iter()
                .map(|strategy| strategy.name())
                .collect(),
        })
}
