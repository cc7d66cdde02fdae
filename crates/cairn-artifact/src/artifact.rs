//! Artifact references
//!
//! Defines [`ArtifactRef`], the immutable descriptor of one requestable
//! artifact, and its builder. The cache path is derived once at construction
//! and doubles as the fetch path relative to the origin.

use crate::digest::{Digest, DigestAlgorithm};
use crate::error::ArtifactError;
use crate::origin::Origin;
use crate::relocation::Relocation;
use crate::unescape_dots;
use std::fmt::{self, Display, Formatter};
use url::Url;

/// File extension used when none is given
pub const DEFAULT_EXTENSION: &str = "jar";

/// Descriptor of a versioned binary artifact
///
/// # Invariants
/// - `cache_path` is `{group as dirs}/{name}/{version}/{name}-{version}[-{classifier}].{extension}`
/// - equal coordinates and origin always produce equal `cache_path` and `fetch_url`
/// - a declared digest has the declared algorithm's output length
/// - immutable after construction; cheap to share across threads
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactRef {
    origin: Origin,
    group: String,
    name: String,
    version: String,
    classifier: Option<String>,
    extension: String,
    digest: Option<Digest>,
    digest_algorithm: DigestAlgorithm,
    relocations: Vec<Relocation>,
    cache_path: String,
    relocated_path: Option<String>,
    friendly_name: String,
    fetch_url: Url,
}

impl ArtifactRef {
    /// Start building a reference
    #[inline]
    #[must_use]
    pub fn builder() -> ArtifactRefBuilder {
        ArtifactRefBuilder::default()
    }

    /// Origin the artifact is fetched from
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Dotted group id
    #[inline]
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Artifact name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artifact version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional classifier
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// File extension
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Declared digest, if any
    #[inline]
    #[must_use]
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// Algorithm used to verify the declared digest
    #[inline]
    #[must_use]
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Declared relocation rules
    #[inline]
    #[must_use]
    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// True when a digest was declared
    #[inline]
    #[must_use]
    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }

    /// True when a classifier was declared
    #[inline]
    #[must_use]
    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// True when at least one relocation rule was declared
    #[inline]
    #[must_use]
    pub fn has_relocations(&self) -> bool {
        !self.relocations.is_empty()
    }

    /// Path relative to the cache root and to the origin
    #[inline]
    #[must_use]
    pub fn cache_path(&self) -> &str {
        &self.cache_path
    }

    /// Path the relocated variant would occupy, when relocations are declared
    #[inline]
    #[must_use]
    pub fn relocated_path(&self) -> Option<&str> {
        self.relocated_path.as_deref()
    }

    /// Flat, human-friendly file name (`group-with-dashes-name-version.ext`)
    #[inline]
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Last segment of the cache path
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.cache_path
            .rsplit('/')
            .next()
            .unwrap_or(self.cache_path.as_str())
    }

    /// Full fetch URL (`origin + cache_path`)
    #[inline]
    #[must_use]
    pub fn fetch_url(&self) -> &Url {
        &self.fetch_url
    }

    /// `group:name:version[:classifier]`
    #[must_use]
    pub fn coordinates(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{}",
                self.group, self.name, self.version, classifier
            ),
            None => format!("{}:{}:{}", self.group, self.name, self.version),
        }
    }

    /// Compute the digest of `bytes` with this reference's algorithm
    #[inline]
    #[must_use]
    pub fn digest_of(&self, bytes: &[u8]) -> Digest {
        self.digest_algorithm.compute(bytes)
    }

    /// Check `bytes` against the declared digest
    ///
    /// Vacuously true when no digest was declared.
    #[must_use]
    pub fn verify(&self, bytes: &[u8]) -> bool {
        match &self.digest {
            None => true,
            Some(expected) => self.digest_of(bytes) == *expected,
        }
    }
}

impl Display for ArtifactRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinates())
    }
}

/// Builder for [`ArtifactRef`]
#[derive(Debug, Default)]
pub struct ArtifactRefBuilder {
    origin: Option<Origin>,
    group: Option<String>,
    name: Option<String>,
    version: Option<String>,
    classifier: Option<String>,
    extension: Option<String>,
    digest: Option<Digest>,
    digest_algorithm: DigestAlgorithm,
    relocations: Vec<Relocation>,
}

impl ArtifactRefBuilder {
    /// Set the origin
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Set the group id (`{}` is accepted in place of `.`)
    #[inline]
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the artifact name
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the version
    #[inline]
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set group, name, version (and optionally classifier) from
    /// `group:name:version[:classifier]`
    ///
    /// # Errors
    /// Returns error if the string does not have three or four parts
    pub fn coordinates(mut self, coordinates: &str) -> Result<Self, ArtifactError> {
        let parts: Vec<&str> = coordinates.split(':').collect();
        match parts.as_slice() {
            [group, name, version] => {
                self.group = Some((*group).to_string());
                self.name = Some((*name).to_string());
                self.version = Some((*version).to_string());
            }
            [group, name, version, classifier] => {
                self.group = Some((*group).to_string());
                self.name = Some((*name).to_string());
                self.version = Some((*version).to_string());
                self.classifier = Some((*classifier).to_string());
            }
            _ => {
                return Err(ArtifactError::InvalidCoordinates(format!(
                    "expected group:name:version, got {coordinates:?}"
                )))
            }
        }
        Ok(self)
    }

    /// Set the classifier
    #[inline]
    #[must_use]
    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Set the file extension (default `jar`)
    #[inline]
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Declare the expected digest
    #[inline]
    #[must_use]
    pub fn digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Declare the expected digest as hex
    ///
    /// # Errors
    /// Returns error if the string is not valid hex
    pub fn digest_hex(self, digest: &str) -> Result<Self, ArtifactError> {
        Ok(self.digest(Digest::from_hex(digest)?))
    }

    /// Declare the expected digest as standard base64
    ///
    /// # Errors
    /// Returns error if the string is not valid base64
    pub fn digest_base64(self, digest: &str) -> Result<Self, ArtifactError> {
        Ok(self.digest(Digest::from_base64(digest)?))
    }

    /// Set the digest algorithm (default SHA-256)
    #[inline]
    #[must_use]
    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Set the digest algorithm by name
    ///
    /// # Errors
    /// Returns error if the algorithm is not available
    pub fn digest_algorithm_name(self, name: &str) -> Result<Self, ArtifactError> {
        Ok(self.digest_algorithm(name.parse()?))
    }

    /// Add a relocation rule
    #[inline]
    #[must_use]
    pub fn relocate(mut self, relocation: Relocation) -> Self {
        self.relocations.push(relocation);
        self
    }

    /// Add several relocation rules
    #[inline]
    #[must_use]
    pub fn relocations(mut self, relocations: impl IntoIterator<Item = Relocation>) -> Self {
        self.relocations.extend(relocations);
        self
    }

    /// Build the reference
    ///
    /// # Errors
    /// Returns error if a required field is missing, a coordinate would
    /// escape the cache layout, or the digest does not fit the algorithm
    pub fn build(self) -> Result<ArtifactRef, ArtifactError> {
        let origin = self.origin.ok_or(ArtifactError::MissingField("origin"))?;
        let group = unescape_dots(&self.group.ok_or(ArtifactError::MissingField("group"))?);
        let name = self.name.ok_or(ArtifactError::MissingField("name"))?;
        let version = self.version.ok_or(ArtifactError::MissingField("version"))?;
        let extension = self
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        for segment in group.split('.') {
            check_segment("group", segment)?;
        }
        check_segment("name", &name)?;
        check_segment("version", &version)?;
        check_segment("extension", &extension)?;
        if let Some(classifier) = &self.classifier {
            check_segment("classifier", classifier)?;
        }
        if let Some(digest) = &self.digest {
            digest.check_len(self.digest_algorithm)?;
        }

        let dir = format!("{}/{name}/{version}", group.replace('.', "/"));
        let stem = match &self.classifier {
            Some(classifier) => format!("{name}-{version}-{classifier}"),
            None => format!("{name}-{version}"),
        };
        let cache_path = format!("{dir}/{stem}.{extension}");
        let relocated_path = (!self.relocations.is_empty())
            .then(|| format!("{dir}/{stem}-relocated.{extension}"));
        let friendly_name = format!("{}-{stem}.{extension}", group.replace('.', "-"));
        let fetch_url = origin.resolve(&cache_path)?;

        Ok(ArtifactRef {
            origin,
            group,
            name,
            version,
            classifier: self.classifier,
            extension,
            digest: self.digest,
            digest_algorithm: self.digest_algorithm,
            relocations: self.relocations,
            cache_path,
            relocated_path,
            friendly_name,
            fetch_url,
        })
    }
}

/// Reject values that are empty, could traverse out of the cache root, or
/// would change meaning once joined into the fetch URL
fn check_segment(field: &str, value: &str) -> Result<(), ArtifactError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', ':', '#', '?', '%'])
        || value.chars().any(char::is_control);

    if invalid {
        return Err(ArtifactError::InvalidCoordinates(format!(
            "{field} segment {value:?} is not allowed"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn origin() -> Origin {
        Origin::parse("https://repo.example.org/maven2/").unwrap()
    }

    fn lib() -> ArtifactRefBuilder {
        ArtifactRef::builder()
            .origin(origin())
            .coordinates("com.example:lib:1.0")
            .unwrap()
    }

    #[test]
    fn cache_path_layout() {
        let artifact = lib().build().unwrap();
        assert_eq!(artifact.cache_path(), "com/example/lib/1.0/lib-1.0.jar");
        assert_eq!(artifact.file_name(), "lib-1.0.jar");
        assert_eq!(artifact.friendly_name(), "com-example-lib-1.0.jar");
        assert_eq!(artifact.relocated_path(), None);
        assert_eq!(artifact.coordinates(), "com.example:lib:1.0");
    }

    #[test]
    fn classifier_and_extension() {
        let artifact = lib().classifier("natives-linux").extension("zip").build().unwrap();
        assert_eq!(
            artifact.cache_path(),
            "com/example/lib/1.0/lib-1.0-natives-linux.zip"
        );
        assert_eq!(artifact.coordinates(), "com.example:lib:1.0:natives-linux");
        assert_eq!(artifact.friendly_name(), "com-example-lib-1.0-natives-linux.zip");
    }

    #[test]
    fn four_part_coordinates_set_classifier() {
        let artifact = ArtifactRef::builder()
            .origin(origin())
            .coordinates("org.acme:core:2.1:sources")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(artifact.classifier(), Some("sources"));
    }

    #[test]
    fn fetch_url_is_origin_plus_cache_path() {
        let artifact = lib().build().unwrap();
        assert_eq!(
            artifact.fetch_url().as_str(),
            format!("{}{}", artifact.origin().base_url(), artifact.cache_path())
        );
    }

    #[test]
    fn escaped_group_is_unescaped() {
        let artifact = ArtifactRef::builder()
            .origin(origin())
            .group("com{}example")
            .name("lib")
            .version("1.0")
            .build()
            .unwrap();
        assert_eq!(artifact.group(), "com.example");
        assert_eq!(artifact.cache_path(), "com/example/lib/1.0/lib-1.0.jar");
    }

    #[test]
    fn relocations_add_relocated_path() {
        let rule = Relocation::builder()
            .pattern("com.example")
            .relocated_pattern("shaded.com.example")
            .build()
            .unwrap();
        let artifact = lib().relocate(rule).build().unwrap();
        assert!(artifact.has_relocations());
        assert_eq!(
            artifact.relocated_path(),
            Some("com/example/lib/1.0/lib-1.0-relocated.jar")
        );
    }

    #[test]
    fn invalid_coordinates_rejected() {
        let result = ArtifactRef::builder().coordinates("com.example:lib");
        assert!(matches!(result, Err(ArtifactError::InvalidCoordinates(_))));
    }

    #[test]
    fn missing_fields_rejected() {
        let result = ArtifactRef::builder().name("lib").version("1").build();
        assert!(matches!(result, Err(ArtifactError::MissingField("origin"))));

        let result = ArtifactRef::builder().origin(origin()).group("g").version("1").build();
        assert!(matches!(result, Err(ArtifactError::MissingField("name"))));
    }

    #[test]
    fn traversal_segments_rejected() {
        for (group, name, version) in [
            ("com..example", "lib", "1.0"),
            ("com.example", "../lib", "1.0"),
            ("com.example", "lib", ".."),
            ("com.example", "lib", "1/0"),
        ] {
            let result = ArtifactRef::builder()
                .origin(origin())
                .group(group)
                .name(name)
                .version(version)
                .build();
            assert!(
                matches!(result, Err(ArtifactError::InvalidCoordinates(_))),
                "{group}:{name}:{version} should be rejected"
            );
        }
    }

    #[test]
    fn url_delimiters_rejected_in_every_segment() {
        let cases = [
            lib().group("com.ex#ample"),
            lib().name("lib#x"),
            lib().version("1.0?y"),
            lib().name("lib%2Fx"),
            lib().classifier("sources?z"),
            lib().extension("j%61r"),
        ];
        for builder in cases {
            let result = builder.build();
            assert!(
                matches!(result, Err(ArtifactError::InvalidCoordinates(_))),
                "{result:?} should be rejected"
            );
        }
    }

    #[test]
    fn digest_length_checked_against_algorithm() {
        let sha256 = DigestAlgorithm::Sha256.compute(b"hello");
        let result = lib()
            .digest(sha256)
            .digest_algorithm(DigestAlgorithm::Sha512)
            .build();
        assert!(matches!(result, Err(ArtifactError::Digest(_))));
    }

    #[test]
    fn unknown_algorithm_is_a_build_error() {
        let result = lib().digest_algorithm_name("md5");
        assert!(matches!(result, Err(ArtifactError::Digest(_))));
    }

    #[test]
    fn verify_with_digest() {
        let artifact = lib()
            .digest_hex("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
            .unwrap()
            .build()
            .unwrap();
        assert!(artifact.has_digest());
        assert!(artifact.verify(b"hello"));
        assert!(!artifact.verify(b"hello "));
        assert!(!artifact.verify(b""));
    }

    #[test]
    fn verify_with_blake3() {
        let digest = DigestAlgorithm::Blake3.compute(b"payload");
        let artifact = lib()
            .digest_algorithm_name("BLAKE3")
            .unwrap()
            .digest(digest)
            .build()
            .unwrap();
        assert!(artifact.verify(b"payload"));
        assert!(!artifact.verify(b"payloaD"));
    }

    #[test]
    fn equal_inputs_equal_refs() {
        let a = lib().build().unwrap();
        let b = lib().build().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cache_path(), b.cache_path());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,8}"
    }

    proptest! {
        #[test]
        fn cache_path_is_deterministic(
            group in prop::collection::vec(segment(), 1..4),
            name in segment(),
            version in "[0-9]{1,2}\\.[0-9]{1,2}",
            classifier in prop::option::of(segment()),
        ) {
            let build = || {
                let mut builder = ArtifactRef::builder()
                    .origin(origin())
                    .group(group.join("."))
                    .name(name.clone())
                    .version(version.clone());
                if let Some(c) = &classifier {
                    builder = builder.classifier(c.clone());
                }
                builder.build().unwrap()
            };

            let a = build();
            let b = build();
            prop_assert_eq!(a.cache_path(), b.cache_path());
            prop_assert_eq!(a.fetch_url(), b.fetch_url());
            prop_assert!(a.cache_path().starts_with(&group.join("/")));
            prop_assert!(a.fetch_url().as_str().ends_with(a.cache_path()));
            prop_assert!(a.fetch_url().path().ends_with(a.cache_path()));
        }

        #[test]
        fn no_digest_always_verifies(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let artifact = lib().build().unwrap();
            prop_assert!(artifact.verify(&bytes));
        }

        #[test]
        fn flipped_byte_fails_verification(
            bytes in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
        ) {
            let artifact = lib()
                .digest(DigestAlgorithm::Sha256.compute(&bytes))
                .build()
                .unwrap();
            let mut tampered = bytes.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 0x01;

            prop_assert!(artifact.verify(&bytes));
            prop_assert!(!artifact.verify(&tampered));
        }
    }
}
