//! Cairn Artifact Model
//!
//! Immutable descriptions of requestable artifacts and the places they are
//! fetched from.
//!
//! # Core Concepts
//!
//! - [`ArtifactRef`]: Coordinates, origin and optional integrity digest of one artifact
//! - [`Origin`]: Remote base URL (with optional credentials) artifacts are fetched relative to
//! - [`Digest`] / [`DigestAlgorithm`]: Declared checksum and the algorithm that recomputes it
//! - [`Relocation`]: Declared package-rewrite rule (carried, not executed)
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn_artifact::{ArtifactRef, Origin};
//!
//! let artifact = ArtifactRef::builder()
//!     .origin(Origin::maven_central().clone())
//!     .coordinates("com.example:lib:1.0")?
//!     .digest_hex("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")?
//!     .build()?;
//!
//! assert_eq!(artifact.cache_path(), "com/example/lib/1.0/lib-1.0.jar");
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod artifact;
mod digest;
mod error;
mod origin;
mod relocation;

pub use artifact::{ArtifactRef, ArtifactRefBuilder, DEFAULT_EXTENSION};
pub use digest::{Digest, DigestAlgorithm};
pub use error::{ArtifactError, DigestError};
pub use origin::{Origin, OriginBuilder};
pub use relocation::{Relocation, RelocationBuilder};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Replace the `{}` placeholder with `.`.
///
/// Package names written with `{}` survive shading tools that rewrite literal
/// dotted strings.
#[inline]
pub(crate) fn unescape_dots(value: &str) -> String {
    value.replace("{}", ".")
}
