//! Inference flow: load schema and model, transform, score, write results.

use crate::data::dataset::Dataset;
use crate::data::reader::read_csv;
use crate::error::MlError;
use crate::features::schema::FeatureSchema;
use crate::features::transformer::FeatureTransformer;
use crate::model::{Classifier, SoftmaxRegression};
use crate::pipeline::PipelineOrchestrator;
use churnflow_core::{ObjectStore, persistence};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Scored input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    /// One row per input record, one column per class.
    pub probabilities: Array2<f64>,
    /// Column names of `probabilities`.
    pub class_labels: Vec<String>,
    pub output_path: PathBuf,
}

impl<O: ObjectStore> PipelineOrchestrator<O> {
    /// Score the records of a CSV file with the default classifier.
    pub async fn predict_file(&self, input: &Path) -> Result<PredictionOutput, MlError> {
        tracing::info!(input = %input.display(), "Starting prediction run");
        let dataset = read_csv(input)?;
        self.predict(&dataset).await
    }

    pub async fn predict(&self, dataset: &Dataset) -> Result<PredictionOutput, MlError> {
        self.predict_with::<SoftmaxRegression>(dataset).await
    }

    /// Score `dataset` with a persisted model of type `C`.
    ///
    /// The schema falls back to the remote tier only when preprocessing
    /// artifacts are configured to be saved remotely; the model always may.
    pub async fn predict_with<C>(&self, dataset: &Dataset) -> Result<PredictionOutput, MlError>
    where
        C: Classifier + DeserializeOwned,
    {
        let schema = FeatureSchema::load(
            &self.store,
            &self.schema_paths()?,
            self.config.preprocessing.save_remote,
        )
        .await?;
        let transformer = FeatureTransformer::from_schema(schema);
        let features = transformer.transform(dataset)?;

        let model: C = self.store.load(&self.model_path()?, true).await?;
        let probabilities = model.predict_proba(&features)?;

        let class_labels = match transformer.schema().and_then(|s| s.label_classes()) {
            Some(classes) if classes.len() == probabilities.ncols() => classes.to_vec(),
            Some(classes) => {
                return Err(MlError::artifact(format!(
                    "model scores {} classes but the encoder knows {} ({})",
                    probabilities.ncols(),
                    classes.len(),
                    classes.join(", ")
                )));
            }
            None => {
                return Err(MlError::artifact(
                    "encoder artifact has no label classes to name the model outputs",
                ));
            }
        };

        let output_path = self.config.prediction.output_path.clone();
        let id_column = &self.config.preprocessing.id_column;
        let bytes = render_csv(dataset, id_column, &class_labels, &probabilities)?;
        persistence::atomic_write(&output_path, &bytes).await?;
        tracing::info!(
            rows = probabilities.nrows(),
            classes = probabilities.ncols(),
            output = %output_path.display(),
            "Wrote predictions"
        );

        Ok(PredictionOutput {
            probabilities,
            class_labels,
            output_path,
        })
    }
}

/// Probability table with the identifier column first when the input has it.
fn render_csv(
    dataset: &Dataset,
    id_column: &str,
    class_labels: &[String],
    probabilities: &Array2<f64>,
) -> Result<Vec<u8>, MlError> {
    let ids = dataset.column(id_column);

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header: Vec<&str> = Vec::with_capacity(class_labels.len() + 1);
    if ids.is_some() {
        header.push(id_column);
    }
    header.extend(class_labels.iter().map(String::as_str));
    writer.write_record(&header)?;

    for (row, probs) in probabilities.rows().into_iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(probs.len() + 1);
        if let Some(column) = ids {
            record.push(column.display(row).unwrap_or_default());
        }
        record.extend(probs.iter().map(|p| p.to_string()));
        writer.write_record(&record)?;
    }

    writer.into_inner().map_err(|e| MlError::Io(e.into_error()))
}
