//! Cairn Store
//!
//! Local persistence and network transfer for artifacts.
//!
//! # Core Concepts
//!
//! - [`CacheStore`]: Filesystem cache keyed by artifact cache path, with atomic publish
//! - [`StagedArtifact`]: Fully written temporary file waiting to be renamed into place
//! - [`Transport`]: Seam for retrieving artifact bytes from an origin
//! - [`HttpFetcher`]: Blocking HTTP implementation of [`Transport`]
//! - [`FetchSettings`]: Timeouts, buffer size and user agent for fetches
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_store::{CacheStore, FetchSettings, HttpFetcher, Transport};
//!
//! let store = CacheStore::new("./libs");
//! if !store.exists(&artifact) {
//!     let bytes = HttpFetcher::new().fetch(&artifact, FetchSettings::global())?;
//!     store.persist(&artifact, &bytes)?;
//! }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod cache;
mod error;
mod fetch;
mod io;
mod settings;

pub use cache::{CacheStore, StagedArtifact, DEFAULT_CACHE_ROOT, PARTIAL_SUFFIX};
pub use error::{FetchError, StoreError};
pub use fetch::{HttpFetcher, Transport};
pub use io::read_fully;
pub use settings::{FetchSettings, DEFAULT_USER_AGENT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
