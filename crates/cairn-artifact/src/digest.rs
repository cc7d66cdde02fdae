//! Integrity digest primitives
//!
//! Provides [`Digest`], the declared checksum of an artifact, and
//! [`DigestAlgorithm`], the algorithm used to recompute it from bytes.

use crate::error::DigestError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::Digest as _;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// Supported checksum algorithms
///
/// The set is closed: an algorithm that is not listed here cannot be named,
/// so "algorithm unavailable" is reported once, when a reference is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DigestAlgorithm {
    /// SHA-256 (default)
    #[default]
    Sha256,

    /// SHA-384
    Sha384,

    /// SHA-512
    Sha512,

    /// BLAKE3 (32-byte output)
    Blake3,
}

impl DigestAlgorithm {
    /// Canonical algorithm name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Output length in bytes
    #[inline]
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Compute the digest of arbitrary data
    #[must_use]
    pub fn compute(self, data: &[u8]) -> Digest {
        let bytes = match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
            Self::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        };
        Digest(bytes)
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    /// Case-insensitive; `-` and `_` are ignored (`sha256`, `SHA-256`, `Sha_256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// A declared or observed checksum
///
/// Raw digest bytes; comparison is byte-for-byte.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Create a digest from raw bytes
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a hex-encoded digest
    ///
    /// # Errors
    /// Returns error if the string is not valid hex
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        Ok(Self(hex::decode(s.trim())?))
    }

    /// Decode a standard base64-encoded digest
    ///
    /// # Errors
    /// Returns error if the string is not valid base64
    pub fn from_base64(s: &str) -> Result<Self, DigestError> {
        Ok(Self(BASE64.decode(s.trim())?))
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the digest is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex encoding
    #[inline]
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Standard base64 encoding
    #[inline]
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        let end = self.0.len().min(8);
        hex::encode(&self.0[..end])
    }

    /// Check the length against an algorithm's output size
    ///
    /// # Errors
    /// Returns error if the lengths differ
    pub fn check_len(&self, algorithm: DigestAlgorithm) -> Result<(), DigestError> {
        if self.0.len() == algorithm.output_len() {
            Ok(())
        } else {
            Err(DigestError::InvalidLength {
                algorithm: algorithm.name(),
                expected: algorithm.output_len(),
                actual: self.0.len(),
            })
        }
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
