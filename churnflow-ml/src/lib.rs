//! # churnflow-ml
//!
//! Feature encoding and the train/predict flows of the churnflow pipeline.
//!
//! A [`FeatureTransformer`] learns a [`FeatureSchema`] (min/max bounds for
//! numerical columns, one-hot vocabularies for categorical columns, label
//! classes) from a training [`Dataset`] and reapplies it unchanged at
//! inference time. The [`PipelineOrchestrator`] persists that schema and the
//! trained classifier through a `churnflow_core::ArtifactStore`.

pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;

// Re-exports
pub use data::{Column, ColumnKind, ColumnValues, DataIngestion, Dataset, parse_csv, read_csv};
pub use error::MlError;
pub use features::{
    ColumnRoles, EncoderState, FeatureSchema, FeatureTransformer, FitOutput, LabelEncoder,
    MinMaxScaler, OneHotEncoder, SchemaPaths,
};
pub use model::{Classifier, SoftmaxRegression, Split, train_test_split};
pub use pipeline::{PipelineOrchestrator, PredictionOutput, TrainReport};
