//! Error types for the artifact model

/// Errors raised while describing an artifact or origin
///
/// All of these are configuration errors: they surface when a reference is
/// built, never while it is being loaded.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// A required builder field was not supplied
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Coordinates are malformed or would escape the cache layout
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Origin or artifact URL could not be formed
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        /// The text that failed to parse
        url: String,
        /// Parser failure
        #[source]
        source: url::ParseError,
    },

    /// Declared digest is unusable
    #[error(transparent)]
    Digest(#[from] DigestError),
}

/// Errors raised while decoding or validating a declared digest
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Algorithm name is not supported on this host
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Digest length does not match the algorithm output
    #[error("invalid {algorithm} digest length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Algorithm the digest was declared for
        algorithm: &'static str,
        /// Output length of that algorithm in bytes
        expected: usize,
        /// Length of the declared digest in bytes
        actual: usize,
    },

    /// Hex decoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Base64 decoding error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
