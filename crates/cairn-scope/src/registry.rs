//! Isolated scope registry
//!
//! Provides [`ScopeRegistry`], which hands out at most one isolated [`Scope`]
//! per distinct set of artifacts. Lookup and creation happen in one critical
//! section, so concurrent callers with the same key always share a scope.

use crate::scope::{Scope, ScopeKind};
use cairn_artifact::ArtifactRef;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Set of artifacts identifying an isolated scope
///
/// Order and duplicates do not matter: `{a, b}` and `{b, a, a}` are one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeKey(BTreeSet<ArtifactRef>);

impl ScopeKey {
    /// Create key from artifacts
    #[inline]
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = ArtifactRef>) -> Self {
        members.into_iter().collect()
    }

    /// Members in sorted order
    pub fn members(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.0.iter()
    }

    /// Number of distinct members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if key has no members
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, artifact: &ArtifactRef) -> bool {
        self.0.contains(artifact)
    }

    fn label(&self) -> String {
        let coords: Vec<_> = self.0.iter().map(ArtifactRef::coordinates).collect();
        format!("isolated[{}]", coords.join(", "))
    }
}

impl FromIterator<ArtifactRef> for ScopeKey {
    fn from_iter<I: IntoIterator<Item = ArtifactRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Registry of isolated scopes keyed by artifact set
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: Mutex<HashMap<ScopeKey, Arc<Scope>>>,
    created: AtomicUsize,
}

impl ScopeRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope for `key`, creating it on first request
    ///
    /// A new scope's search path is seeded with the members' remote URLs.
    #[must_use]
    pub fn get_or_create(&self, key: &ScopeKey) -> Arc<Scope> {
        let mut scopes = self.scopes.lock();
        if let Some(scope) = scopes.get(key) {
            return Arc::clone(scope);
        }

        let scope = Arc::new(
            Scope::builder(ScopeKind::Isolated)
                .label(key.label())
                .seed(key.members().map(|artifact| artifact.fetch_url().clone()))
                .build(),
        );
        scopes.insert(key.clone(), Arc::clone(&scope));
        self.created.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(scope = %scope.id(), members = key.len(), "created isolated scope");
        scope
    }

    /// Existing scope for `key`
    #[must_use]
    pub fn get(&self, key: &ScopeKey) -> Option<Arc<Scope>> {
        self.scopes.lock().get(key).cloned()
    }

    /// Number of scopes held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.lock().len()
    }

    /// Check if registry holds no scopes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.lock().is_empty()
    }

    /// Total scopes ever created by this registry
    #[inline]
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_artifact::Origin;
    use std::sync::Barrier;
    use std::thread;

    fn artifact(name: &str) -> ArtifactRef {
        ArtifactRef::builder()
            .origin(Origin::parse("https://repo.example.org/").unwrap())
            .group("com.example")
            .name(name)
            .version("1.0")
            .build()
            .unwrap()
    }

    #[test]
    fn key_ignores_order_and_duplicates() {
        let a = ScopeKey::new([artifact("a"), artifact("b")]);
        let b = ScopeKey::new([artifact("b"), artifact("a"), artifact("a")]);
        assert_eq!(a, b);
        assert_eq!(b.len(), 2);
        assert!(a.contains(&artifact("a")));
        assert!(!a.contains(&artifact("c")));
    }

    #[test]
    fn same_key_same_scope() {
        let registry = ScopeRegistry::new();
        let first = registry.get_or_create(&ScopeKey::new([artifact("a"), artifact("b")]));
        let second = registry.get_or_create(&ScopeKey::new([artifact("b"), artifact("a")]));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.created(), 1);
    }

    #[test]
    fn different_keys_different_scopes() {
        let registry = ScopeRegistry::new();
        let a = registry.get_or_create(&ScopeKey::new([artifact("a")]));
        let b = registry.get_or_create(&ScopeKey::new([artifact("a"), artifact("b")]));

        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn new_scope_is_seeded_with_remote_urls() {
        let registry = ScopeRegistry::new();
        let key = ScopeKey::new([artifact("a")]);
        let scope = registry.get_or_create(&key);

        assert_eq!(scope.kind(), ScopeKind::Isolated);
        assert_eq!(
            scope.search_path(),
            vec![artifact("a").fetch_url().clone()]
        );
        assert_eq!(scope.label(), "isolated[com.example:a:1.0]");
    }

    #[test]
    fn get_does_not_create() {
        let registry = ScopeRegistry::new();
        let key = ScopeKey::new([artifact("a")]);
        assert!(registry.get(&key).is_none());
        assert!(registry.is_empty());

        let scope = registry.get_or_create(&key);
        assert!(Arc::ptr_eq(&scope, &registry.get(&key).unwrap()));
    }

    #[test]
    fn concurrent_requests_share_one_scope() {
        const THREADS: usize = 16;
        let registry = Arc::new(ScopeRegistry::new());
        let barrier = Arc::new(Barrier::new(THREADS));
        let key = ScopeKey::new([artifact("a"), artifact("b")]);

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let key = key.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_or_create(&key)
                })
            })
            .collect();

        let scopes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(scopes.iter().all(|scope| Arc::ptr_eq(scope, &scopes[0])));
        assert_eq!(registry.created(), 1);
    }
}
