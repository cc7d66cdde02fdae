//! Package relocation rules
//!
//! A [`Relocation`] declares that classes under `pattern` should be rewritten
//! to `relocated_pattern`. Rules are carried on the artifact reference and
//! determine its relocated cache path; the rewrite pass itself is not part of
//! this crate.

use crate::error::ArtifactError;
use crate::unescape_dots;

/// One package rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Relocation {
    pattern: String,
    relocated_pattern: String,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl Relocation {
    /// Start building a relocation rule
    #[inline]
    #[must_use]
    pub fn builder() -> RelocationBuilder {
        RelocationBuilder::default()
    }

    /// Source package pattern
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Target package pattern
    #[inline]
    #[must_use]
    pub fn relocated_pattern(&self) -> &str {
        &self.relocated_pattern
    }

    /// Paths the rule is restricted to (empty = everything)
    #[inline]
    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Paths exempt from the rule
    #[inline]
    #[must_use]
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }
}

/// Builder for [`Relocation`]
#[derive(Debug, Default)]
pub struct RelocationBuilder {
    pattern: Option<String>,
    relocated_pattern: Option<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl RelocationBuilder {
    /// Set the source pattern (`{}` is accepted in place of `.`)
    #[inline]
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the target pattern (`{}` is accepted in place of `.`)
    #[inline]
    #[must_use]
    pub fn relocated_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.relocated_pattern = Some(pattern.into());
        self
    }

    /// Add an include filter
    #[inline]
    #[must_use]
    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.includes.push(include.into());
        self
    }

    /// Add an exclude filter
    #[inline]
    #[must_use]
    pub fn exclude(mut self, exclude: impl Into<String>) -> Self {
        self.excludes.push(exclude.into());
        self
    }

    /// Build the rule
    ///
    /// # Errors
    /// Returns error if either pattern is missing
    pub fn build(self) -> Result<Relocation, ArtifactError> {
        let pattern = self.pattern.ok_or(ArtifactError::MissingField("pattern"))?;
        let relocated = self
            .relocated_pattern
            .ok_or(ArtifactError::MissingField("relocated_pattern"))?;

        Ok(Relocation {
            pattern: unescape_dots(&pattern),
            relocated_pattern: unescape_dots(&relocated),
            includes: self.includes,
            excludes: self.excludes,
        })
    }
}
