//! Two-tier artifact storage: local filesystem first, remote object store second.
//!
//! The store treats every artifact as an opaque blob. Typed `save`/`load`
//! serialize through `serde_json`; `save_bytes`/`load_bytes` skip that step.

pub mod path;
pub mod remote;
pub mod sigv4;

pub use path::LogicalPath;
pub use remote::{HttpObjectStore, InMemoryObjectStore, ObjectStore};

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use crate::persistence;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a successful `save` wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReceipt {
    pub logical_path: String,
    pub local_path: PathBuf,
    /// Remote object key, when the artifact was also uploaded.
    pub remote_key: Option<String>,
    pub sha256: String,
    pub size_bytes: u64,
    pub saved_at: DateTime<Utc>,
}

/// Artifact store with a local-first, remote-fallback read policy.
///
/// Holds no artifact state of its own; callers own what they save and load.
#[derive(Debug)]
pub struct ArtifactStore<O = HttpObjectStore> {
    local_root: PathBuf,
    remote: Option<O>,
    key_prefix: Option<String>,
}

impl ArtifactStore<HttpObjectStore> {
    /// Build a store from configuration, connecting the HTTP backend when a
    /// remote bucket is configured.
    pub fn from_config(config: &StorageConfig) -> StoreResult<Self> {
        let remote = config
            .remote()
            .map(HttpObjectStore::from_config)
            .transpose()?;
        let key_prefix = config.remote().and_then(|r| r.prefix.clone());
        Ok(Self {
            local_root: config.local_root.clone(),
            remote,
            key_prefix,
        })
    }

    /// A store without a remote tier.
    pub fn local_only(local_root: impl Into<PathBuf>) -> Self {
        Self::new(local_root, None)
    }
}

impl<O: ObjectStore> ArtifactStore<O> {
    pub fn new(local_root: impl Into<PathBuf>, remote: Option<O>) -> Self {
        Self {
            local_root: local_root.into(),
            remote,
            key_prefix: None,
        }
    }

    /// Prefix every remote key with `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn remote(&self) -> Option<&O> {
        self.remote.as_ref()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Local file a logical path resolves to.
    pub fn local_path(&self, path: &LogicalPath) -> PathBuf {
        path.local_path(&self.local_root)
    }

    /// Remote object key a logical path resolves to.
    pub fn remote_key(&self, path: &LogicalPath) -> String {
        path.remote_key(self.key_prefix.as_deref())
    }

    pub fn exists_locally(&self, path: &LogicalPath) -> bool {
        self.local_path(path).is_file()
    }

    /// Serialize `artifact` and save it. See [`ArtifactStore::save_bytes`].
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        artifact: &T,
        path: &LogicalPath,
        also_remote: bool,
    ) -> StoreResult<ArtifactReceipt> {
        let bytes = serde_json::to_vec_pretty(artifact)?;
        self.save_bytes(bytes, path, also_remote).await
    }

    /// Write `bytes` to the local tier, then optionally upload them.
    ///
    /// A local failure aborts the call. A remote failure after the local
    /// write returns [`StoreError::RemoteUpload`]; the local file stays valid.
    pub async fn save_bytes(
        &self,
        bytes: Vec<u8>,
        path: &LogicalPath,
        also_remote: bool,
    ) -> StoreResult<ArtifactReceipt> {
        let local_path = self.local_path(path);
        let sha256 = persistence::sha256_hex(&bytes);
        let size_bytes = bytes.len() as u64;

        persistence::atomic_write(&local_path, &bytes).await?;
        tracing::info!(artifact = %path, local = %local_path.display(), size_bytes, "Saved artifact locally");

        let remote_key = if also_remote {
            let key = self.remote_key(path);
            let upload_failed = |message: String| StoreError::RemoteUpload {
                key: key.clone(),
                local_path: local_path.clone(),
                message,
            };

            let remote = self.remote.as_ref().ok_or_else(|| {
                upload_failed("no remote object store is configured".to_string())
            })?;
            if let Err(e) = remote.put(&key, bytes).await {
                tracing::warn!(artifact = %path, error = %e, "Remote upload failed; local copy kept");
                return Err(upload_failed(e.to_string()));
            }
            tracing::info!(artifact = %path, remote = %remote.describe(&key), "Uploaded artifact");
            Some(key)
        } else {
            None
        };

        Ok(ArtifactReceipt {
            logical_path: path.to_string(),
            local_path,
            remote_key,
            sha256,
            size_bytes,
            saved_at: Utc::now(),
        })
    }

    /// Load and deserialize an artifact. See [`ArtifactStore::load_bytes`].
    pub async fn load<T: DeserializeOwned>(
        &self,
        path: &LogicalPath,
        allow_remote_fallback: bool,
    ) -> StoreResult<T> {
        let bytes = self.load_bytes(path, allow_remote_fallback).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read an artifact's bytes, local tier first.
    ///
    /// The remote tier is consulted only when the local file is absent and
    /// `allow_remote_fallback` is set.
    pub async fn load_bytes(
        &self,
        path: &LogicalPath,
        allow_remote_fallback: bool,
    ) -> StoreResult<Vec<u8>> {
        let local_path = self.local_path(path);
        if local_path.is_file() {
            tracing::debug!(artifact = %path, local = %local_path.display(), "Loading artifact from local tier");
            return Ok(tokio::fs::read(&local_path).await?);
        }

        if !allow_remote_fallback {
            return Err(StoreError::not_found(format!(
                "{path} (local: {})",
                local_path.display()
            )));
        }

        tracing::debug!(artifact = %path, "Local artifact absent, falling back to remote tier");
        self.fetch_remote(path).await
    }

    /// Fetch an object straight from the remote tier.
    pub async fn fetch_remote(&self, path: &LogicalPath) -> StoreResult<Vec<u8>> {
        let remote = self.remote.as_ref().ok_or_else(|| {
            StoreError::configuration(format!(
                "remote fallback requested for '{path}' but no remote object store is configured"
            ))
        })?;

        let key = self.remote_key(path);
        match remote.get(&key).await? {
            Some(bytes) => {
                tracing::info!(artifact = %path, remote = %remote.describe(&key), "Loaded artifact from remote tier");
                Ok(bytes)
            }
            None => Err(StoreError::not_found(format!(
                "{path} (local: {}, remote: {})",
                self.local_path(path).display(),
                remote.describe(&key)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Vocabulary {
        column: String,
        values: Vec<String>,
    }

    fn vocabulary() -> Vocabulary {
        Vocabulary {
            column: "country".into(),
            values: vec!["A".into(), "B".into()],
        }
    }

    fn lp(path: &str) -> LogicalPath {
        LogicalPath::new(path).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load_local() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::local_only(dir.path());
        let path = lp("artifacts/nested/encoder.json");

        let receipt = store.save(&vocabulary(), &path, false).await.unwrap();
        assert!(receipt.local_path.exists());
        assert!(receipt.remote_key.is_none());
        assert_eq!(receipt.sha256.len(), 64);

        let loaded: Vocabulary = store.load(&path, false).await.unwrap();
        assert_eq!(loaded, vocabulary());
    }

    #[tokio::test]
    async fn test_local_hit_never_touches_remote() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));
        let path = lp("artifacts/encoder.json");
        store.save(&vocabulary(), &path, false).await.unwrap();

        let loaded: Vocabulary = store.load(&path, false).await.unwrap();
        assert_eq!(loaded, vocabulary());
        let loaded: Vocabulary = store.load(&path, true).await.unwrap();
        assert_eq!(loaded, vocabulary());

        assert_eq!(store.remote().unwrap().request_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_without_remote_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::local_only(dir.path());

        let err = store
            .load::<Vocabulary>(&lp("artifacts/encoder.json"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_missing_without_fallback_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));

        let err = store
            .load::<Vocabulary>(&lp("artifacts/encoder.json"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.remote().unwrap().request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_in_both_tiers_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));

        let err = store
            .load::<Vocabulary>(&lp("artifacts/encoder.json"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.remote().unwrap().get_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_fallback_deserializes() {
        let dir = TempDir::new().unwrap();
        let bytes = serde_json::to_vec(&vocabulary()).unwrap();
        let remote = InMemoryObjectStore::new().with_object("prod/artifacts/encoder.json", bytes);
        let store = ArtifactStore::new(dir.path(), Some(remote)).with_key_prefix("prod");

        let loaded: Vocabulary = store.load(&lp("artifacts/encoder.json"), true).await.unwrap();
        assert_eq!(loaded, vocabulary());
        // Fallback does not populate the local tier.
        assert!(!store.exists_locally(&lp("artifacts/encoder.json")));
    }

    #[tokio::test]
    async fn test_save_uploads_same_bytes() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));
        let path = lp("artifacts/scaler.json");

        let receipt = store.save(&vocabulary(), &path, true).await.unwrap();
        assert_eq!(receipt.remote_key.as_deref(), Some("artifacts/scaler.json"));

        let local = std::fs::read(&receipt.local_path).unwrap();
        let remote = store.remote().unwrap().object("artifacts/scaler.json").unwrap();
        assert_eq!(local, remote);
        assert_eq!(receipt.sha256, persistence::sha256_hex(&remote));
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_local_copy() {
        let dir = TempDir::new().unwrap();
        let remote = InMemoryObjectStore::new();
        remote.fail_uploads(true);
        let store = ArtifactStore::new(dir.path(), Some(remote));
        let path = lp("artifacts/model.json");

        let err = store.save(&vocabulary(), &path, true).await.unwrap_err();
        assert!(err.is_partial_save());
        assert!(store.exists_locally(&path));

        let loaded: Vocabulary = store.load(&path, false).await.unwrap();
        assert_eq!(loaded, vocabulary());
    }

    #[tokio::test]
    async fn test_also_remote_without_remote_keeps_local_copy() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::local_only(dir.path());
        let path = lp("artifacts/model.json");

        let err = store.save(&vocabulary(), &path, true).await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUpload { .. }));
        assert!(store.exists_locally(&path));
    }

    #[tokio::test]
    async fn test_local_write_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        // A file where the parent directory should be.
        std::fs::write(dir.path().join("artifacts"), b"").unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));

        let err = store
            .save(&vocabulary(), &lp("artifacts/model.json"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.remote().unwrap().put_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_local_artifact_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::local_only(dir.path());
        let path = lp("artifacts/encoder.json");
        store.save_bytes(b"not json".to_vec(), &path, false).await.unwrap();

        let err = store.load::<Vocabulary>(&path, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_from_config_without_remote() {
        let config = StorageConfig::local("/srv/churn");
        let store = ArtifactStore::from_config(&config).unwrap();
        assert!(!store.has_remote());
        assert_eq!(store.local_root(), Path::new("/srv/churn"));
    }

    #[test]
    fn test_from_config_with_remote_prefix() {
        let mut config = StorageConfig::local("/srv/churn");
        let mut remote = crate::config::RemoteConfig::new("http://localhost:9000", "churn");
        remote.prefix = Some("staging".into());
        config.remote = Some(remote);

        let store = ArtifactStore::from_config(&config).unwrap();
        assert!(store.has_remote());
        assert_eq!(
            store.remote_key(&lp("artifacts/model.json")),
            "staging/artifacts/model.json"
        );
    }
}
