//! Cairn Core - runtime artifact loader
//!
//! Acquires versioned binary artifacts from remote origins, verifies them
//! against declared digests, keeps them in a local cache, and makes them
//! resolvable inside an execution scope:
//! - Cache hits are re-verified and never trigger a download
//! - Downloads are verified before anything is written to disk
//! - Cache writes are atomic
//! - Artifacts go into the caller's shared scope or an isolated one per artifact set
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_artifact::{ArtifactRef, Origin};
//! use cairn_core::{Cairn, CairnConfig};
//! use cairn_scope::Scope;
//! use std::sync::Arc;
//!
//! let host = Arc::new(Scope::shared("app"));
//! let cairn = Cairn::new(CairnConfig::new().with_cache_root("./libs"), &host)?;
//!
//! let artifact = ArtifactRef::builder()
//!     .origin(Origin::maven_central().clone())
//!     .coordinates("com.example:lib:1.0")?
//!     .digest_hex("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")?
//!     .build()?;
//!
//! let result = cairn.load(&artifact);
//! println!("{}", result.message());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cairn;
pub mod config;
pub mod error;
pub mod result;

pub use cairn::{AcquireSource, Acquired, Cairn};
pub use config::{CairnConfig, ConfigError};
pub use error::{LoadError, SetupError};
pub use result::{LoadResult, LoadStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Cairn
    pub use crate::{Cairn, CairnConfig, LoadResult, LoadStatus};
    pub use cairn_artifact::{ArtifactRef, Origin};
    pub use cairn_scope::{Scope, ScopeKey};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
