//! Train and predict flows over the configured artifact store.

pub mod predict;
pub mod train;

pub use predict::PredictionOutput;
pub use train::TrainReport;

use crate::error::MlError;
use crate::features::schema::SchemaPaths;
use churnflow_core::{ArtifactStore, HttpObjectStore, LogicalPath, ObjectStore, PipelineConfig};

/// Runs the training and inference flows against one [`ArtifactStore`].
#[derive(Debug)]
pub struct PipelineOrchestrator<O = HttpObjectStore> {
    config: PipelineConfig,
    store: ArtifactStore<O>,
}

impl PipelineOrchestrator<HttpObjectStore> {
    /// Build the store described by `config.storage` and wrap it.
    pub fn from_config(config: PipelineConfig) -> Result<Self, MlError> {
        let store = ArtifactStore::from_config(&config.storage)?;
        Ok(Self::new(config, store))
    }
}

impl<O: ObjectStore> PipelineOrchestrator<O> {
    pub fn new(config: PipelineConfig, store: ArtifactStore<O>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore<O> {
        &self.store
    }

    fn schema_paths(&self) -> Result<SchemaPaths, MlError> {
        SchemaPaths::from_config(&self.config.preprocessing)
    }

    fn model_path(&self) -> Result<LogicalPath, MlError> {
        Ok(LogicalPath::new(&self.config.model.model_path)?)
    }
}
