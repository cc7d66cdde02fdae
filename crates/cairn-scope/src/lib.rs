//! Cairn Scopes
//!
//! Execution scopes that verified artifacts are made resolvable in, and the
//! machinery for injecting into them.
//!
//! # Core Concepts
//!
//! - [`Scope`]: Search path of artifact URLs; either the shared scope or an isolated one
//! - [`ScopeSource`]: Caller execution context that can be bound as the shared scope
//! - [`InjectionStrategy`]: Capability-ranked way of appending a path to a scope
//! - [`StructuredInjection`]: Goes through the scope's own append operation (preferred)
//! - [`TableInjection`]: Writes the scope's raw tables directly (fallback)
//! - [`ScopeRegistry`]: At most one isolated scope per [`ScopeKey`]
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_scope::{process_strategy, Scope, ScopeKey, ScopeRegistry};
//!
//! let strategy = process_strategy()?;
//! let registry = ScopeRegistry::new();
//! let scope = registry.get_or_create(&ScopeKey::from_iter([artifact.clone()]));
//! strategy.inject_path(&scope, &local_path)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod registry;
mod scope;
mod strategy;

pub use error::ScopeError;
pub use registry::{ScopeKey, ScopeRegistry};
pub use scope::{Scope, ScopeBuilder, ScopeId, ScopeKind, ScopeSource};
pub use strategy::{
    default_strategies, process_strategy, select_strategy, HostCapabilities, InjectionStrategy,
    StructuredInjection, TableInjection, DISABLE_STRUCTURED_ENV, DISABLE_TABLE_ENV,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
