//! The Cairn orchestrator
//!
//! Drives every load through the same pipeline:
//! 1. Serialize on the artifact's cache path
//! 2. Cache hit: verify when a digest is declared; a mismatch fails without
//!    touching the network
//! 3. Cache miss: fetch, verify, then persist atomically
//! 4. Inject the local path into the target scope
//!
//! Failures at any stage are captured in a [`LoadResult`].

use crate::config::CairnConfig;
use crate::error::{LoadError, SetupError};
use crate::result::{LoadResult, LoadStatus};
use cairn_artifact::ArtifactRef;
use cairn_scope::{process_strategy, InjectionStrategy, Scope, ScopeKey, ScopeRegistry, ScopeSource};
use cairn_store::{CacheStore, FetchSettings, HttpFetcher, Transport};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where acquired bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireSource {
    Cache,
    Network,
}

/// A verified artifact on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub path: PathBuf,
    pub source: AcquireSource,
}

impl Acquired {
    fn status(&self) -> LoadStatus {
        match self.source {
            AcquireSource::Cache => LoadStatus::Cached,
            AcquireSource::Network => LoadStatus::Fetched,
        }
    }
}

/// Runtime artifact loader
///
/// Bound to one cache root and one shared scope. Safe to share across
/// threads; every operation blocks the calling thread.
pub struct Cairn {
    /// Configuration
    config: CairnConfig,
    /// Local artifact cache
    cache: CacheStore,
    /// Network seam
    transport: Arc<dyn Transport>,
    /// How paths reach scopes
    strategy: Arc<dyn InjectionStrategy>,
    /// The caller's own scope
    shared: Arc<Scope>,
    /// Isolated scopes by artifact set
    registry: ScopeRegistry,
    /// One lock per cache path, removed once no acquisition holds it
    in_flight: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl Cairn {
    /// Create an orchestrator bound to `host` as the shared scope
    ///
    /// Uses the process-wide injection strategy and the HTTP transport.
    ///
    /// # Errors
    /// - `UnsupportedScopeSource` if `host` has no scope
    /// - `NoSupportedStrategy` if the host permits no injection mechanism
    /// - `CacheRoot` if the cache directory cannot be created
    pub fn new(config: CairnConfig, host: &dyn ScopeSource) -> Result<Self, SetupError> {
        let shared = host.bind()?;
        let strategy = process_strategy()?;

        let cache = CacheStore::new(config.cache_root.clone());
        cache.ensure_root().map_err(|source| SetupError::CacheRoot {
            path: cache.root().to_path_buf(),
            source,
        })?;

        tracing::info!(
            cache_root = %cache.root().display(),
            scope = %shared,
            strategy = strategy.name(),
            "cairn ready"
        );

        Ok(Self {
            config,
            cache,
            transport: Arc::new(HttpFetcher::new()),
            strategy,
            shared,
            registry: ScopeRegistry::new(),
            in_flight: DashMap::new(),
        })
    }

    /// Create an orchestrator from a TOML configuration file
    ///
    /// # Errors
    /// - `Config` if the file cannot be read or parsed
    /// - Any error [`Cairn::new`] returns
    pub fn from_config_file(
        path: impl AsRef<Path>,
        host: &dyn ScopeSource,
    ) -> Result<Self, SetupError> {
        let config = CairnConfig::from_file(path)?;
        Self::new(config, host)
    }

    /// Replace the transport
    #[inline]
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the injection strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn InjectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    #[inline]
    #[must_use]
    pub fn shared_scope(&self) -> &Arc<Scope> {
        &self.shared
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Name of the injection strategy in use
    #[inline]
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Isolated scope for `key`, created on first request
    #[must_use]
    pub fn isolated_scope(&self, key: &ScopeKey) -> Arc<Scope> {
        self.registry.get_or_create(key)
    }

    /// Make a verified copy of `artifact` available on local disk
    ///
    /// Uses the configured fetch settings when `settings` is `None`.
    /// Concurrent calls for the same artifact download at most once.
    ///
    /// # Errors
    /// - `ChecksumMismatch` if cached or downloaded bytes fail verification
    /// - `CacheUnreadable` if a cached file cannot be read
    /// - `DownloadFailed` if the origin cannot deliver the bytes
    /// - `PersistFailed` if the bytes cannot be written into the cache
    pub fn acquire(
        &self,
        artifact: &ArtifactRef,
        settings: Option<&FetchSettings>,
    ) -> Result<Acquired, LoadError> {
        let settings = settings.unwrap_or(&self.config.fetch);
        let path = self.cache.path_for(artifact);

        let lock = Arc::clone(self.in_flight.entry(path.clone()).or_default().value());
        let result = {
            let _guard = lock.lock();
            self.acquire_locked(artifact, settings, path.clone())
        };

        drop(lock);
        self.in_flight
            .remove_if(&path, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of cache paths with an acquisition in progress
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn acquire_locked(
        &self,
        artifact: &ArtifactRef,
        settings: &FetchSettings,
        path: PathBuf,
    ) -> Result<Acquired, LoadError> {
        if self.cache.exists(artifact) {
            // Without a digest the cached file is trusted as-is.
            if artifact.has_digest() {
                let bytes = self
                    .cache
                    .read_all(artifact, settings.buffer_size)
                    .map_err(|source| LoadError::CacheUnreadable {
                        artifact: artifact.coordinates(),
                        source,
                    })?;
                verify(artifact, &bytes, true)?;
            }

            tracing::debug!(artifact = %artifact, path = %path.display(), "cache hit");
            return Ok(Acquired {
                path,
                source: AcquireSource::Cache,
            });
        }

        tracing::info!(artifact = %artifact, url = %artifact.fetch_url(), "downloading");
        let bytes = self
            .transport
            .fetch(artifact, settings)
            .map_err(|source| LoadError::DownloadFailed {
                artifact: artifact.coordinates(),
                source,
            })?;
        verify(artifact, &bytes, false)?;

        if artifact.has_relocations() {
            tracing::warn!(
                artifact = %artifact,
                relocations = artifact.relocations().len(),
                "relocation is not performed; using the artifact as published"
            );
        }

        let path = self
            .cache
            .persist(artifact, &bytes)
            .map_err(|source| LoadError::PersistFailed {
                artifact: artifact.coordinates(),
                source,
            })?;

        tracing::info!(artifact = %artifact, path = %path.display(), bytes = bytes.len(), "cached");
        Ok(Acquired {
            path,
            source: AcquireSource::Network,
        })
    }

    /// Load into the shared scope with the configured settings
    pub fn load(&self, artifact: &ArtifactRef) -> LoadResult {
        self.load_with(artifact, &self.shared, None)
    }

    /// Load into `scope`
    pub fn load_with(
        &self,
        artifact: &ArtifactRef,
        scope: &Scope,
        settings: Option<&FetchSettings>,
    ) -> LoadResult {
        let acquired = match self.acquire(artifact, settings) {
            Ok(acquired) => acquired,
            Err(err) => {
                tracing::warn!(artifact = %artifact, error = %err, "load failed");
                return LoadResult::failure(artifact.clone(), err, None);
            }
        };

        match self.strategy.inject_path(scope, &acquired.path) {
            Ok(url) => {
                tracing::debug!(artifact = %artifact, scope = %scope, url = %url, "injected");
                LoadResult::success(artifact.clone(), acquired.status(), acquired.path)
            }
            Err(source) => {
                let err = LoadError::InjectionFailed {
                    artifact: artifact.coordinates(),
                    source,
                };
                tracing::warn!(artifact = %artifact, scope = %scope, error = %err, "injection failed");
                LoadResult::failure(artifact.clone(), err, Some(acquired.path))
            }
        }
    }

    /// Load into the isolated scope for `key`
    ///
    /// `artifact` need not be a member of `key`.
    pub fn load_isolated(&self, artifact: &ArtifactRef, key: &ScopeKey) -> LoadResult {
        let scope = self.registry.get_or_create(key);
        self.load_with(artifact, &scope, None)
    }

    /// Load every artifact into the one isolated scope keyed by all of them
    pub fn load_isolated_set(&self, artifacts: &[ArtifactRef]) -> (Arc<Scope>, Vec<LoadResult>) {
        let key: ScopeKey = artifacts.iter().cloned().collect();
        let scope = self.registry.get_or_create(&key);
        let results = artifacts
            .iter()
            .map(|artifact| self.load_with(artifact, &scope, None))
            .collect();
        (scope, results)
    }

    /// Load every artifact into the shared scope, in order
    ///
    /// A failure does not stop the batch.
    pub fn load_all(&self, artifacts: &[ArtifactRef]) -> Vec<LoadResult> {
        let results: Vec<_> = artifacts.iter().map(|artifact| self.load(artifact)).collect();
        let failed = results.iter().filter(|result| !result.is_success()).count();
        tracing::info!(total = results.len(), failed, "batch load finished");
        results
    }
}

impl Debug for Cairn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cairn")
            .field("cache_root", &self.cache.root())
            .field("strategy", &self.strategy.name())
            .field("shared", &self.shared.id())
            .field("isolated_scopes", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn verify(artifact: &ArtifactRef, bytes: &[u8], cached: bool) -> Result<(), LoadError> {
    if artifact.verify(bytes) {
        return Ok(());
    }

    let expected = artifact
        .digest()
        .map(ToString::to_string)
        .unwrap_or_default();
    let actual = artifact.digest_of(bytes).to_string();
    tracing::warn!(artifact = %artifact, %expected, %actual, cached, "checksum mismatch");

    Err(LoadError::ChecksumMismatch {
        artifact: artifact.coordinates(),
        expected,
        actual,
        cached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use cairn_scope::{ScopeKind, StructuredInjection, TableInjection};
    use cairn_store::FetchError;
    use cairn_test_utils::{plain_ref, sample_ref};
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        pub Net {}

        impl Transport for Net {
            fn fetch(
                &self,
                artifact: &ArtifactRef,
                settings: &FetchSettings,
            ) -> Result<Vec<u8>, FetchError>;
        }
    }

    fn cairn_with(transport: MockNet) -> (Cairn, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Scope::shared("host"));
        let cairn = Cairn::new(CairnConfig::new().with_cache_root(dir.path()), &host)
            .unwrap()
            .with_transport(Arc::new(transport))
            .with_strategy(Arc::new(StructuredInjection));
        (cairn, dir)
    }

    fn serving(body: &'static [u8], times: usize) -> MockNet {
        let mut net = MockNet::new();
        net.expect_fetch()
            .times(times)
            .returning(move |_, _| Ok(body.to_vec()));
        net
    }

    #[test]
    fn miss_downloads_and_persists() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let artifact = sample_ref("lib", b"hello");

        let acquired = cairn.acquire(&artifact, None).unwrap();
        assert_eq!(acquired.source, AcquireSource::Network);
        assert!(acquired.path.ends_with("com/example/lib/1.0/lib-1.0.jar"));
        assert_eq!(std::fs::read(&acquired.path).unwrap(), b"hello");
    }

    #[test]
    fn second_acquire_hits_cache() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let artifact = sample_ref("lib", b"hello");

        let first = cairn.acquire(&artifact, None).unwrap();
        let second = cairn.acquire(&artifact, None).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(second.source, AcquireSource::Cache);
    }

    #[test]
    fn mismatched_download_is_not_persisted() {
        let (cairn, _dir) = cairn_with(serving(b"hellO", 1));
        let artifact = sample_ref("lib", b"hello");

        let err = cairn.acquire(&artifact, None).unwrap_err();
        assert!(matches!(err, LoadError::ChecksumMismatch { cached: false, .. }));
        assert!(!cairn.cache().exists(&artifact));
    }

    #[test]
    fn tampered_cache_fails_without_network() {
        let (cairn, _dir) = cairn_with(serving(b"unused", 0));
        let artifact = sample_ref("lib", b"hello");
        cairn.cache().persist(&artifact, b"tampered").unwrap();

        let err = cairn.acquire(&artifact, None).unwrap_err();
        assert!(matches!(err, LoadError::ChecksumMismatch { cached: true, .. }));
    }

    #[test]
    fn no_digest_accepts_any_bytes() {
        let (cairn, _dir) = cairn_with(serving(b"anything at all", 1));
        let acquired = cairn.acquire(&plain_ref("lib"), None).unwrap();
        assert_eq!(acquired.source, AcquireSource::Network);
    }

    #[test]
    fn undigested_cache_hit_skips_reading() {
        let (cairn, _dir) = cairn_with(serving(b"unused", 0));
        let artifact = plain_ref("lib");
        let path = cairn.cache().persist(&artifact, b"whatever was cached").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        }

        let acquired = cairn.acquire(&artifact, None).unwrap();
        assert_eq!(acquired.source, AcquireSource::Cache);
        assert_eq!(acquired.path, path);
    }

    #[test]
    fn path_locks_are_released() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let artifact = sample_ref("lib", b"hello");

        cairn.acquire(&artifact, None).unwrap();
        cairn.acquire(&artifact, None).unwrap();
        assert_eq!(cairn.in_flight(), 0);
    }

    #[test]
    fn failed_acquire_releases_path_lock() {
        let (cairn, _dir) = cairn_with(serving(b"hellO", 1));
        assert!(cairn.acquire(&sample_ref("lib", b"hello"), None).is_err());
        assert_eq!(cairn.in_flight(), 0);
    }

    #[test]
    fn download_failure_is_reported() {
        let mut net = MockNet::new();
        net.expect_fetch().times(1).returning(|artifact, _| {
            Err(FetchError::Status {
                url: artifact.fetch_url().to_string(),
                status: 503,
            })
        });
        let (cairn, _dir) = cairn_with(net);

        let result = cairn.load(&plain_ref("lib"));
        assert_eq!(result.status(), LoadStatus::DownloadFailed);
        assert!(result.message().contains("com.example:lib:1.0"));
        assert!(result.path().is_none());
    }

    #[test]
    fn settings_override_reaches_transport() {
        let mut net = MockNet::new();
        net.expect_fetch()
            .withf(|_, settings| settings.user_agent == "override/1")
            .times(1)
            .returning(|_, _| Ok(b"x".to_vec()));
        let (cairn, _dir) = cairn_with(net);

        let settings = FetchSettings::new().with_user_agent("override/1");
        cairn.acquire(&plain_ref("lib"), Some(&settings)).unwrap();
    }

    #[test]
    fn load_injects_into_shared_scope() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let artifact = sample_ref("lib", b"hello");

        let result = cairn.load(&artifact);
        assert!(result.is_success());
        assert_eq!(result.status(), LoadStatus::Fetched);
        assert!(cairn.shared_scope().resolve("lib-1.0.jar").is_some());
    }

    #[test]
    fn sealed_scope_with_structured_strategy_fails_injection() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let sealed = Scope::builder(ScopeKind::Shared).sealed().build();
        let artifact = sample_ref("lib", b"hello");

        let result = cairn.load_with(&artifact, &sealed, None);
        assert_eq!(result.status(), LoadStatus::InjectionFailed);
        assert!(result.path().is_some());
        assert!(cairn.cache().exists(&artifact));
    }

    #[test]
    fn table_strategy_reaches_sealed_scope() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let cairn = cairn.with_strategy(Arc::new(TableInjection));
        let sealed = Scope::builder(ScopeKind::Shared).sealed().build();

        let result = cairn.load_with(&sample_ref("lib", b"hello"), &sealed, None);
        assert!(result.is_success());
        assert_eq!(sealed.search_path().len(), 1);
    }

    #[test]
    fn load_isolated_uses_registry_scope() {
        let (cairn, _dir) = cairn_with(serving(b"hello", 1));
        let artifact = sample_ref("lib", b"hello");
        let key = ScopeKey::new([artifact.clone()]);

        let result = cairn.load_isolated(&artifact, &key);
        assert!(result.is_success());

        let scope = cairn.isolated_scope(&key);
        assert_eq!(scope.kind(), ScopeKind::Isolated);
        // Seeded remote URL plus the injected local file.
        assert_eq!(scope.search_path().len(), 2);
        assert!(cairn.shared_scope().search_path().is_empty());
        assert_eq!(cairn.registry().created(), 1);
    }

    #[test]
    fn debug_omits_transport() {
        let (cairn, _dir) = cairn_with(serving(b"", 0));
        let shown = format!("{cairn:?}");
        assert!(shown.contains("structured"));
    }

    #[test]
    fn builds_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let path = dir.path().join("cairn.toml");
        std::fs::write(
            &path,
            format!(
                "cache_root = '{}'\n[fetch]\nuser_agent = \"app/3\"\n",
                root.display()
            ),
        )
        .unwrap();

        let host = Arc::new(Scope::shared("host"));
        let cairn = Cairn::from_config_file(&path, &host).unwrap();
        assert_eq!(cairn.cache().root(), root.as_path());
        assert_eq!(cairn.config().fetch.user_agent, "app/3");
        assert!(root.is_dir());
    }

    #[test]
    fn unreadable_config_file_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Scope::shared("host"));

        let missing = Cairn::from_config_file(dir.path().join("absent.toml"), &host).unwrap_err();
        assert!(matches!(missing, SetupError::Config(ConfigError::Read { .. })));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "cache_root = 5").unwrap();
        let invalid = Cairn::from_config_file(&path, &host).unwrap_err();
        assert!(matches!(invalid, SetupError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn headless_host_is_rejected() {
        struct Headless;
        impl ScopeSource for Headless {
            fn resolution_scope(&self) -> Option<Arc<Scope>> {
                None
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let err = Cairn::new(CairnConfig::new().with_cache_root(dir.path()), &Headless).unwrap_err();
        assert!(matches!(err, SetupError::UnsupportedScopeSource(_)));
    }
}
