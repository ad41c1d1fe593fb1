//! # churnflow-core
//!
//! Core services for the churnflow pipeline: layered configuration, atomic
//! persistence helpers, and the two-tier [`ArtifactStore`] that keeps
//! transformer and model state on the local filesystem and, optionally, in a
//! remote object store.

pub mod config;
pub mod error;
pub mod persistence;
pub mod storage;

// Re-export commonly used types at the crate root.
pub use config::{
    ClassifierParams, IngestionConfig, ModelConfig, PipelineConfig, PredictionConfig,
    PreprocessConfig, RemoteConfig, SplitConfig, StorageConfig, load_config,
};
pub use error::{ConfigError, StoreError, StoreResult};
pub use storage::{
    ArtifactReceipt, ArtifactStore, HttpObjectStore, InMemoryObjectStore, LogicalPath, ObjectStore,
};
