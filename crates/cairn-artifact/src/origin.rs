//! Remote origins artifacts are fetched from
//!
//! Provides [`Origin`], a base URL plus optional credentials. Artifact paths
//! are always resolved relative to the origin, never as absolute URLs.

use crate::error::ArtifactError;
use once_cell::sync::Lazy;
use std::fmt::{self, Debug, Display, Formatter};
use url::Url;

static MAVEN_CENTRAL: Lazy<Origin> = Lazy::new(|| {
    Origin::parse("https://repo1.maven.org/maven2/").expect("maven central url is valid")
});

static GOOGLE: Lazy<Origin> =
    Lazy::new(|| Origin::parse("https://maven.google.com/").expect("google maven url is valid"));

/// A remote source of artifacts
///
/// Immutable value. The base URL always ends with `/` so that relative
/// artifact paths are appended rather than replacing the last segment.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Origin {
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl Origin {
    /// Create an anonymous origin from a base URL
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            username: None,
            password: None,
        }
    }

    /// Parse an anonymous origin from a URL string
    ///
    /// # Errors
    /// Returns error if the URL cannot be parsed
    pub fn parse(url: &str) -> Result<Self, ArtifactError> {
        let parsed = Url::parse(url).map_err(|source| ArtifactError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::new(parsed))
    }

    /// Start building an origin
    #[inline]
    #[must_use]
    pub fn builder() -> OriginBuilder {
        OriginBuilder::default()
    }

    /// The public central registry, initialized on first use
    #[inline]
    #[must_use]
    pub fn maven_central() -> &'static Origin {
        &MAVEN_CENTRAL
    }

    /// Google's registry, initialized on first use
    #[inline]
    #[must_use]
    pub fn google() -> &'static Origin {
        &GOOGLE
    }

    /// Base URL (always ends with `/`)
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Username, if any
    #[inline]
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password, if any
    #[inline]
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// True only when both username and password are present
    #[inline]
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Resolve a path relative to this origin
    ///
    /// Leading `/` on `relative` is ignored so the result never escapes the
    /// base path.
    ///
    /// # Errors
    /// Returns error if the joined URL is invalid
    pub fn resolve(&self, relative: &str) -> Result<Url, ArtifactError> {
        let relative = relative.trim_start_matches('/');
        self.base_url
            .join(relative)
            .map_err(|source| ArtifactError::InvalidUrl {
                url: format!("{}{}", self.base_url, relative),
                source,
            })
    }
}

impl Debug for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_url.as_str())
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Builder for [`Origin`]
#[derive(Debug, Default)]
pub struct OriginBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl OriginBuilder {
    /// Set the base URL
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the username
    #[inline]
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    #[inline]
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Build the origin
    ///
    /// # Errors
    /// Returns error if the URL is missing or invalid
    pub fn build(self) -> Result<Origin, ArtifactError> {
        let url = self.url.ok_or(ArtifactError::MissingField("url"))?;
        let mut origin = Origin::parse(&url)?;
        origin.username = self.username;
        origin.password = self.password;
        Ok(origin)
    }
}
