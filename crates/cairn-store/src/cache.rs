//! Filesystem artifact cache
//!
//! Provides [`CacheStore`], which maps each artifact's cache path onto a
//! directory root and publishes new files atomically:
//! - bytes are written in full to a temporary file in the target directory
//! - the temporary file is flushed, then renamed onto the final path
//! - a reader that sees the final path always sees complete bytes

use crate::error::StoreError;
use crate::io::read_fully;
use cairn_artifact::ArtifactRef;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cache root used when none is configured
pub const DEFAULT_CACHE_ROOT: &str = "./libs";

/// Suffix of temporary files that have not been published yet
pub const PARTIAL_SUFFIX: &str = ".tmpart";

/// Local artifact cache rooted at a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`
    ///
    /// Does not touch the filesystem; see [`CacheStore::ensure_root`].
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it is missing
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateDir {
            path: self.root.clone(),
            source,
        })
    }

    /// Local path of an artifact
    #[must_use]
    pub fn path_for(&self, artifact: &ArtifactRef) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(artifact.cache_path().split('/'));
        path
    }

    /// Whether the artifact has been published
    #[inline]
    #[must_use]
    pub fn exists(&self, artifact: &ArtifactRef) -> bool {
        self.path_for(artifact).is_file()
    }

    /// Read the cached bytes of an artifact
    ///
    /// # Errors
    /// Returns error if the file is missing or unreadable
    pub fn read_all(
        &self,
        artifact: &ArtifactRef,
        buffer_size: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(artifact);
        File::open(&path)
            .and_then(|file| read_fully(file, buffer_size))
            .map_err(|source| StoreError::Read { path, source })
    }

    /// Write bytes to a temporary file next to the artifact's final path
    ///
    /// Parent directories are created on demand. Nothing is visible at the
    /// final path until [`StagedArtifact::commit`] is called; dropping the
    /// staged artifact removes the temporary file.
    ///
    /// # Errors
    /// Returns error if directories or the temporary file cannot be written
    pub fn stage(&self, artifact: &ArtifactRef, bytes: &[u8]) -> Result<StagedArtifact, StoreError> {
        let target = self.path_for(artifact);
        let parent = target
            .parent()
            .ok_or_else(|| StoreError::NoParent(target.clone()))?
            .to_path_buf();

        fs::create_dir_all(&parent).map_err(|source| StoreError::CreateDir {
            path: parent.clone(),
            source,
        })?;

        let prefix = format!(".{}.", artifact.file_name());
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&parent)
            .map_err(|source| StoreError::Write {
                path: parent.clone(),
                source,
            })?;

        temp.write_all(bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|source| StoreError::Write {
                path: temp.path().to_path_buf(),
                source,
            })?;

        tracing::debug!(
            artifact = %artifact,
            temp = %temp.path().display(),
            bytes = bytes.len(),
            "staged artifact"
        );

        Ok(StagedArtifact { temp, target })
    }

    /// Atomically write an artifact into the cache
    ///
    /// # Errors
    /// Returns error if staging or the final rename fails
    pub fn persist(&self, artifact: &ArtifactRef, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        self.stage(artifact, bytes)?.commit()
    }

    /// Remove unpublished temporary files left behind by interrupted writes
    ///
    /// Returns the number of files removed. A missing root is not an error.
    ///
    /// # Errors
    /// Returns error if a directory cannot be listed
    pub fn sweep_partials(&self) -> Result<usize, StoreError> {
        if !self.root.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|source| StoreError::Read {
                path: dir.clone(),
                source,
            })?;

            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_partial(&path) && fs::remove_file(&path).is_ok() {
                    tracing::debug!(path = %path.display(), "removed partial artifact");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

impl Default for CacheStore {
    /// Store rooted at `./libs`
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ROOT)
    }
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(PARTIAL_SUFFIX))
}

/// A fully written temporary file awaiting publication
#[derive(Debug)]
pub struct StagedArtifact {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedArtifact {
    /// Location of the temporary file
    #[inline]
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Final location once committed
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temporary file onto the final path
    ///
    /// An existing file at the target is replaced, so two writers racing on
    /// the same artifact leave one complete copy.
    ///
    /// # Errors
    /// Returns error if the rename fails; the temporary file is removed
    pub fn commit(self) -> Result<PathBuf, StoreError> {
        let Self { temp, target } = self;
        temp.persist(&target).map_err(|err| StoreError::Publish {
            path: target.clone(),
            source: err.error,
        })?;
        tracing::debug!(path = %target.display(), "published artifact");
        Ok(target)
    }
}
