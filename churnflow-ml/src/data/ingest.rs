//! Training dataset ingestion: local CSV first, remote object second.

use crate::data::dataset::Dataset;
use crate::data::reader::{parse_csv, read_csv};
use crate::error::MlError;
use churnflow_core::{ArtifactStore, IngestionConfig, LogicalPath, ObjectStore};
use std::path::PathBuf;

/// Fetches the training dataset named by an [`IngestionConfig`].
#[derive(Debug, Clone)]
pub struct DataIngestion {
    config: IngestionConfig,
}

impl DataIngestion {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    /// `<local_dir>/<filename>`.
    pub fn local_path(&self) -> PathBuf {
        self.config.local_dir.join(&self.config.filename)
    }

    /// `<remote_dir>/<filename>` as a logical path on the store's remote tier.
    pub fn remote_path(&self) -> Result<LogicalPath, MlError> {
        Ok(LogicalPath::new(format!(
            "{}/{}",
            self.config.remote_dir, self.config.filename
        ))?)
    }

    /// Load the dataset.
    ///
    /// Uses the local file when it exists. Otherwise downloads from the
    /// store's remote tier, which fails with a configuration error when no
    /// remote is configured and with not-found when the object is absent.
    pub async fn fetch<O: ObjectStore>(&self, store: &ArtifactStore<O>) -> Result<Dataset, MlError> {
        let local = self.local_path();
        if local.is_file() {
            tracing::info!(path = %local.display(), "Using local dataset");
            return read_csv(&local);
        }

        let remote = self.remote_path()?;
        tracing::info!(
            local = %local.display(),
            remote = %store.remote_key(&remote),
            "Local dataset absent, fetching from remote store"
        );
        let bytes = store.fetch_remote(&remote).await?;
        parse_csv(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnflow_core::{InMemoryObjectStore, StoreError};
    use tempfile::TempDir;

    const CSV: &str = "cust_id,count_total,country,churn\n1,10,A,Yes\n2,20,B,No\n";

    fn config(dir: &TempDir) -> IngestionConfig {
        IngestionConfig {
            filename: "churn.csv".into(),
            local_dir: dir.path().join("data"),
            remote_dir: "data".into(),
        }
    }

    #[tokio::test]
    async fn test_prefers_local_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/churn.csv"), CSV).unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));

        let ds = DataIngestion::new(config(&dir)).fetch(&store).await.unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(store.remote().unwrap().request_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_remote_object() {
        let dir = TempDir::new().unwrap();
        let remote = InMemoryObjectStore::new().with_object("data/churn.csv", CSV.as_bytes().to_vec());
        let store = ArtifactStore::new(dir.path(), Some(remote));

        let ds = DataIngestion::new(config(&dir)).fetch(&store).await.unwrap();
        assert_eq!(ds.column_names(), vec!["cust_id", "count_total", "country", "churn"]);
    }

    #[tokio::test]
    async fn test_no_local_no_remote_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::local_only(dir.path());

        let err = DataIngestion::new(config(&dir)).fetch(&store).await.unwrap_err();
        assert!(matches!(err.as_store(), Some(StoreError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_absent_everywhere_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), Some(InMemoryObjectStore::new()));

        let err = DataIngestion::new(config(&dir)).fetch(&store).await.unwrap_err();
        assert!(matches!(err.as_store(), Some(StoreError::NotFound { .. })));
    }
}
