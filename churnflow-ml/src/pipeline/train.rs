//! Training flow: ingest, fit features, persist schema, fit and persist model.

use crate::data::dataset::Dataset;
use crate::data::ingest::DataIngestion;
use crate::error::MlError;
use crate::features::transformer::{FeatureTransformer, FitOutput};
use crate::model::{Classifier, SoftmaxRegression, accuracy, log_loss, train_test_split};
use crate::pipeline::PipelineOrchestrator;
use chrono::{DateTime, Utc};
use churnflow_core::{ArtifactReceipt, ObjectStore};
use serde::{Deserialize, Serialize};

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub model: String,
    pub n_rows: usize,
    pub n_train: usize,
    pub n_validation: usize,
    pub feature_names: Vec<String>,
    /// Label classes in encoding order.
    pub classes: Vec<String>,
    pub validation_accuracy: Option<f64>,
    pub validation_log_loss: Option<f64>,
    /// Encoder, scaler and model receipts, in save order.
    pub artifacts: Vec<ArtifactReceipt>,
    pub finished_at: DateTime<Utc>,
}

impl<O: ObjectStore> PipelineOrchestrator<O> {
    /// Ingest the configured dataset and train the default classifier.
    pub async fn train(&self) -> Result<TrainReport, MlError> {
        let dataset = DataIngestion::new(self.config.ingestion.clone())
            .fetch(&self.store)
            .await?;
        self.train_on(&dataset).await
    }

    /// Train the default classifier on an in-memory dataset.
    pub async fn train_on(&self, dataset: &Dataset) -> Result<TrainReport, MlError> {
        let model = SoftmaxRegression::new(self.config.model.params.clone());
        let (report, _) = self.train_with(dataset, model).await?;
        Ok(report)
    }

    /// Train `model` on `dataset` and persist schema and model artifacts.
    pub async fn train_with<C>(&self, dataset: &Dataset, mut model: C) -> Result<(TrainReport, C), MlError>
    where
        C: Classifier + Serialize,
    {
        let label_column = &self.config.preprocessing.label_column;
        tracing::info!(rows = dataset.n_rows(), columns = dataset.n_columns(), "Starting training run");

        let mut transformer = FeatureTransformer::from_config(&self.config.preprocessing);
        let FitOutput { features, labels } = transformer.fit(dataset)?;
        let labels = labels.ok_or_else(|| {
            MlError::dataset(format!("training dataset lacks label column '{label_column}'"))
        })?;
        let schema = transformer
            .into_schema()
            .ok_or_else(|| MlError::state("transformer holds no schema after fit"))?;
        let classes = schema.label_classes().map(<[String]>::to_vec).unwrap_or_default();

        let mut artifacts = schema
            .save(&self.store, &self.schema_paths()?, self.config.preprocessing.save_remote)
            .await?;

        let split = train_test_split(
            &features,
            &labels,
            self.config.split.test_size,
            self.config.split.random_state,
        )?;
        model.fit(&split.x_train, &split.y_train, classes.len())?;

        let (validation_accuracy, validation_log_loss) = if split.y_test.is_empty() {
            (None, None)
        } else {
            let proba = model.predict_proba(&split.x_test)?;
            (accuracy(&proba, &split.y_test), log_loss(&proba, &split.y_test))
        };
        tracing::info!(
            model = model.name(),
            train = split.y_train.len(),
            validation = split.y_test.len(),
            accuracy = ?validation_accuracy,
            log_loss = ?validation_log_loss,
            "Classifier trained"
        );

        let receipt = self
            .store
            .save(&model, &self.model_path()?, self.config.model.save_remote)
            .await?;
        artifacts.push(receipt);

        let report = TrainReport {
            model: model.name().to_string(),
            n_rows: dataset.n_rows(),
            n_train: split.y_train.len(),
            n_validation: split.y_test.len(),
            feature_names: schema.feature_names(),
            classes,
            validation_accuracy,
            validation_log_loss,
            artifacts,
            finished_at: Utc::now(),
        };
        Ok((report, model))
    }
}
