//! Execution scopes
//!
//! A [`Scope`] is the search path an execution context resolves code from.
//! It keeps two tables, mirroring how a lazy loader tracks its entries:
//! - the search path: every URL ever added, in order
//! - the unopened queue: URLs added but not yet opened for lookup
//!
//! URLs are opened on demand by [`Scope::resolve`]. Entries are never removed.

use crate::error::ScopeError;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Scope kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// The caller's own context, bound once
    Shared,

    /// A separate context invisible to the caller's code
    Isolated,
}

/// Raw tables of a scope, for low-level injection
pub(crate) struct ScopeTables<'a> {
    pub(crate) search_path: &'a RwLock<Vec<Url>>,
    pub(crate) unopened: &'a Mutex<VecDeque<Url>>,
}

/// Code-resolution context that accepts new artifact paths
///
/// Thread-safe. Lock order is always `unopened` before the other tables.
#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    kind: ScopeKind,
    label: String,
    sealed: bool,
    search_path: RwLock<Vec<Url>>,
    unopened: Mutex<VecDeque<Url>>,
    opened: RwLock<Vec<Url>>,
    generation: AtomicU64,
}

impl Scope {
    /// Start building a scope
    #[inline]
    #[must_use]
    pub fn builder(kind: ScopeKind) -> ScopeBuilder {
        ScopeBuilder::new(kind)
    }

    /// Empty shared scope
    #[must_use]
    pub fn shared(label: impl Into<String>) -> Self {
        Self::builder(ScopeKind::Shared).label(label).build()
    }

    /// Isolated scope seeded with `urls`
    #[must_use]
    pub fn isolated(urls: impl IntoIterator<Item = Url>) -> Self {
        Self::builder(ScopeKind::Isolated).seed(urls).build()
    }

    /// Scope identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Scope kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Human-readable label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True when the structured append operation is closed to outside callers
    #[inline]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of structured appends so far
    ///
    /// Writes through [`ScopeTables`] bypass this counter.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Snapshot of the search path
    #[must_use]
    pub fn search_path(&self) -> Vec<Url> {
        self.search_path.read().clone()
    }

    /// Whether `url` was ever added
    #[must_use]
    pub fn contains(&self, url: &Url) -> bool {
        self.search_path.read().contains(url)
    }

    /// Number of added but unopened entries
    #[must_use]
    pub fn pending(&self) -> usize {
        self.unopened.lock().len()
    }

    /// Snapshot of opened entries
    #[must_use]
    pub fn opened(&self) -> Vec<Url> {
        self.opened.read().clone()
    }

    /// Open every pending entry, returning how many were opened
    pub fn open_pending(&self) -> usize {
        let mut unopened = self.unopened.lock();
        let count = unopened.len();
        if count > 0 {
            self.opened.write().extend(unopened.drain(..));
        }
        count
    }

    /// Find the first entry whose file name is `file_name`
    ///
    /// Opens pending entries first.
    #[must_use]
    pub fn resolve(&self, file_name: &str) -> Option<Url> {
        self.open_pending();
        self.opened
            .read()
            .iter()
            .find(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .is_some_and(|last| last == file_name)
            })
            .cloned()
    }

    /// Structured append: the scope's own "add resolvable path" operation
    pub(crate) fn append(&self, url: Url) -> Result<(), ScopeError> {
        if self.sealed {
            return Err(ScopeError::InjectionFailed {
                strategy: "structured",
                scope: self.id,
                url: url.to_string(),
                reason: "scope is sealed against structured access".to_string(),
            });
        }

        let mut unopened = self.unopened.lock();
        self.search_path.write().push(url.clone());
        unopened.push_back(url);
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Direct access to the search path and unopened queue
    pub(crate) fn tables(&self) -> ScopeTables<'_> {
        ScopeTables {
            search_path: &self.search_path,
            unopened: &self.unopened,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

/// Builder for [`Scope`]
#[derive(Debug)]
pub struct ScopeBuilder {
    kind: ScopeKind,
    label: Option<String>,
    seed: Vec<Url>,
    sealed: bool,
}

impl ScopeBuilder {
    /// Create new builder
    #[inline]
    #[must_use]
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            label: None,
            seed: Vec::new(),
            sealed: false,
        }
    }

    /// Set the label
    #[inline]
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Seed the search path
    #[inline]
    #[must_use]
    pub fn seed(mut self, urls: impl IntoIterator<Item = Url>) -> Self {
        self.seed.extend(urls);
        self
    }

    /// Close the structured append operation
    #[inline]
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// Build the scope
    #[must_use]
    pub fn build(self) -> Scope {
        let label = self.label.unwrap_or_else(|| match self.kind {
            ScopeKind::Shared => "shared".to_string(),
            ScopeKind::Isolated => "isolated".to_string(),
        });

        Scope {
            id: ScopeId::next(),
            kind: self.kind,
            label,
            sealed: self.sealed,
            unopened: Mutex::new(self.seed.iter().cloned().collect()),
            search_path: RwLock::new(self.seed),
            opened: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }
}

/// An execution context that can be bound as the shared scope
pub trait ScopeSource {
    /// The context's resolution scope, or `None` if it has none
    fn resolution_scope(&self) -> Option<Arc<Scope>>;

    /// Short description used in error messages
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Bind the context as a scope
    ///
    /// # Errors
    /// Returns [`ScopeError::UnsupportedScopeSource`] when the context has no scope
    fn bind(&self) -> Result<Arc<Scope>, ScopeError> {
        self.resolution_scope()
            .ok_or_else(|| ScopeError::UnsupportedScopeSource(self.describe()))
    }
}

impl ScopeSource for Arc<Scope> {
    fn resolution_scope(&self) -> Option<Arc<Scope>> {
        Some(Arc::clone(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(name: &str) -> Url {
        Url::parse(&format!("file:///opt/libs/{name}")).unwrap()
    }

    struct Headless;

    impl ScopeSource for Headless {
        fn resolution_scope(&self) -> Option<Arc<Scope>> {
            None
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = Scope::shared("a");
        let b = Scope::shared("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), ScopeKind::Shared);
    }

    #[test]
    fn isolated_scope_is_seeded() {
        let scope = Scope::isolated([url("a.jar"), url("b.jar")]);
        assert_eq!(scope.kind(), ScopeKind::Isolated);
        assert_eq!(scope.search_path(), vec![url("a.jar"), url("b.jar")]);
        assert_eq!(scope.pending(), 2);
        assert!(scope.opened().is_empty());
    }

    #[test]
    fn append_updates_both_tables() {
        let scope = Scope::shared("host");
        scope.append(url("a.jar")).unwrap();

        assert!(scope.contains(&url("a.jar")));
        assert_eq!(scope.pending(), 1);
        assert_eq!(scope.generation(), 1);
    }

    #[test]
    fn sealed_scope_rejects_structured_append() {
        let scope = Scope::builder(ScopeKind::Shared).sealed().build();
        let result = scope.append(url("a.jar"));
        assert!(matches!(result, Err(ScopeError::InjectionFailed { .. })));
        assert!(scope.search_path().is_empty());
    }

    #[test]
    fn resolve_opens_pending_entries() {
        let scope = Scope::isolated([url("a.jar")]);
        scope.append(url("b.jar")).unwrap();

        assert_eq!(scope.resolve("b.jar"), Some(url("b.jar")));
        assert_eq!(scope.pending(), 0);
        assert_eq!(scope.opened().len(), 2);
        assert_eq!(scope.resolve("missing.jar"), None);
    }

    #[test]
    fn arc_scope_is_a_source() {
        let scope = Arc::new(Scope::shared("host"));
        let bound = scope.bind().unwrap();
        assert!(Arc::ptr_eq(&scope, &bound));
    }

    #[test]
    fn headless_source_is_unsupported() {
        let result = Headless.bind();
        assert!(matches!(result, Err(ScopeError::UnsupportedScopeSource(_))));
    }

    #[test]
    fn display_includes_label_and_id() {
        let scope = Scope::shared("host");
        let shown = scope.to_string();
        assert!(shown.starts_with("host (scope-"));
    }
}
