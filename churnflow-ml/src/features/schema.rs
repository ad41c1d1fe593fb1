//! Fitted feature schema and its two persisted artifacts.
//!
//! The schema is stored as an encoder artifact (column roles, one-hot
//! vocabularies, label classes) and a scaler artifact (min/max bounds).

use crate::data::dataset::{Column, ColumnValues, Dataset};
use crate::error::MlError;
use crate::features::encoder::{LabelEncoder, OneHotEncoder};
use crate::features::scaler::MinMaxScaler;
use churnflow_core::{ArtifactReceipt, ArtifactStore, LogicalPath, ObjectStore, PreprocessConfig, StoreError};
use ndarray::{Array1, Array2, s};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Identifier and label column names. Both are excluded from features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub id_column: String,
    pub label_column: String,
}

impl ColumnRoles {
    pub fn new(id_column: impl Into<String>, label_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            label_column: label_column.into(),
        }
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new(&config.id_column, &config.label_column)
    }

    pub fn is_feature(&self, column: &str) -> bool {
        column != self.id_column && column != self.label_column
    }
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self::new("cust_id", "churn")
    }
}

/// Persisted form of the encoder artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub roles: ColumnRoles,
    pub one_hot: OneHotEncoder,
    pub labels: Option<LabelEncoder>,
}

/// Logical locations of the encoder and scaler artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPaths {
    pub encoder: LogicalPath,
    pub scaler: LogicalPath,
}

impl SchemaPaths {
    pub fn from_config(config: &PreprocessConfig) -> Result<Self, MlError> {
        Ok(Self {
            encoder: LogicalPath::new(&config.encoder_path)?,
            scaler: LogicalPath::new(&config.scaler_path)?,
        })
    }
}

/// Learned, immutable description of how raw columns become features.
///
/// Output layout: scaled numerical columns in schema order, then one
/// indicator block per categorical column in vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    roles: ColumnRoles,
    scaler: MinMaxScaler,
    encoder: OneHotEncoder,
    labels: Option<LabelEncoder>,
}

impl FeatureSchema {
    /// Learn a schema from `dataset`.
    ///
    /// Feature columns are partitioned by kind in dataset order. The label
    /// vocabulary is learned only when the label column is present.
    pub fn fit(roles: ColumnRoles, dataset: &Dataset) -> Result<Self, MlError> {
        if dataset.is_empty() {
            return Err(MlError::dataset("cannot fit a feature schema on an empty dataset"));
        }

        let features: Vec<&Column> = dataset
            .columns()
            .iter()
            .filter(|c| roles.is_feature(&c.name))
            .collect();

        let scaler = MinMaxScaler::fit(features.iter().filter_map(|c| match &c.values {
            ColumnValues::Numeric(v) => Some((c.name.as_str(), v.as_slice())),
            ColumnValues::Categorical(_) => None,
        }))?;
        let encoder = OneHotEncoder::fit(features.iter().filter_map(|c| match &c.values {
            ColumnValues::Categorical(v) => Some((c.name.as_str(), v.as_slice())),
            ColumnValues::Numeric(_) => None,
        }));
        let labels = dataset
            .column(&roles.label_column)
            .map(|c| LabelEncoder::fit(&c.name, &c.values))
            .transpose()?;

        Ok(Self {
            roles,
            scaler,
            encoder,
            labels,
        })
    }

    /// Reassemble a schema from its persisted parts, checking consistency.
    pub fn from_parts(encoder: EncoderState, scaler: MinMaxScaler) -> Result<Self, MlError> {
        encoder.one_hot.validate()?;
        scaler.validate()?;

        let roles = encoder.roles;
        for column in scaler.columns().iter().chain(encoder.one_hot.columns()) {
            if !roles.is_feature(column) {
                return Err(MlError::artifact(format!(
                    "feature column '{column}' collides with the identifier or label column"
                )));
            }
        }
        if let Some(column) = scaler
            .columns()
            .iter()
            .find(|c| encoder.one_hot.columns().contains(c))
        {
            return Err(MlError::artifact(format!(
                "column '{column}' is both numerical and categorical"
            )));
        }
        if let Some(labels) = &encoder.labels {
            if labels.column() != roles.label_column {
                return Err(MlError::artifact(format!(
                    "label encoder fitted on '{}' but the label column is '{}'",
                    labels.column(),
                    roles.label_column
                )));
            }
        }

        Ok(Self {
            roles,
            scaler,
            encoder: encoder.one_hot,
            labels: encoder.labels,
        })
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub fn numerical_columns(&self) -> &[String] {
        self.scaler.columns()
    }

    pub fn categorical_columns(&self) -> &[String] {
        self.encoder.columns()
    }

    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.encoder.vocabulary(column)
    }

    pub fn bounds(&self, column: &str) -> Option<(f64, f64)> {
        self.scaler.bounds(column)
    }

    /// Label classes in encoding order, when labels were present at fit.
    pub fn label_classes(&self) -> Option<&[String]> {
        self.labels.as_ref().map(LabelEncoder::classes)
    }

    pub fn n_features(&self) -> usize {
        self.scaler.columns().len() + self.encoder.n_outputs()
    }

    /// Output column names in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.scaler.columns().to_vec();
        names.extend(self.encoder.feature_names());
        names
    }

    /// Apply the schema to `dataset`. Columns outside the schema are ignored.
    pub fn transform(&self, dataset: &Dataset) -> Result<Array2<f64>, MlError> {
        let mut out = Array2::<f64>::zeros((dataset.n_rows(), self.n_features()));

        for (index, name) in self.scaler.columns().iter().enumerate() {
            let values = numeric_values(require(dataset, name)?)?;
            self.scaler.scale_into(index, &values, out.column_mut(index));
        }

        let mut offset = self.scaler.columns().len();
        for (index, name) in self.encoder.columns().iter().enumerate() {
            let width = self.encoder.block_width(index);
            let values = require(dataset, name)?.categories();
            self.encoder
                .encode_into(index, &values, out.slice_mut(s![.., offset..offset + width]));
            offset += width;
        }

        Ok(out)
    }

    /// Encode the label column, if both the schema and `dataset` carry one.
    pub fn encode_labels(&self, dataset: &Dataset) -> Result<Option<Array1<usize>>, MlError> {
        match (&self.labels, dataset.column(&self.roles.label_column)) {
            (Some(labels), Some(column)) => labels.encode(&column.values).map(Some),
            _ => Ok(None),
        }
    }

    /// Split into the persisted encoder and scaler artifacts.
    pub fn to_parts(&self) -> (EncoderState, MinMaxScaler) {
        (
            EncoderState {
                roles: self.roles.clone(),
                one_hot: self.encoder.clone(),
                labels: self.labels.clone(),
            },
            self.scaler.clone(),
        )
    }

    /// Persist both artifacts.
    ///
    /// Both local writes happen even if the first upload fails; the first
    /// upload error is returned after that.
    pub async fn save<O: ObjectStore>(
        &self,
        store: &ArtifactStore<O>,
        paths: &SchemaPaths,
        also_remote: bool,
    ) -> Result<Vec<ArtifactReceipt>, MlError> {
        let (encoder, scaler) = self.to_parts();
        let mut receipts = Vec::with_capacity(2);
        let mut upload_error: Option<StoreError> = None;

        for result in [
            store.save(&encoder, &paths.encoder, also_remote).await,
            store.save(&scaler, &paths.scaler, also_remote).await,
        ] {
            match result {
                Ok(receipt) => receipts.push(receipt),
                Err(e) if e.is_partial_save() => {
                    upload_error.get_or_insert(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        match upload_error {
            Some(e) => Err(e.into()),
            None => Ok(receipts),
        }
    }

    /// Load both artifacts and reassemble the schema.
    pub async fn load<O: ObjectStore>(
        store: &ArtifactStore<O>,
        paths: &SchemaPaths,
        allow_remote_fallback: bool,
    ) -> Result<Self, MlError> {
        let encoder: EncoderState = store.load(&paths.encoder, allow_remote_fallback).await?;
        let scaler: MinMaxScaler = store.load(&paths.scaler, allow_remote_fallback).await?;
        Self::from_parts(encoder, scaler)
    }
}

fn require<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, MlError> {
    dataset
        .column(name)
        .ok_or_else(|| MlError::schema_mismatch(format!("required column '{name}' is missing")))
}

fn numeric_values(column: &Column) -> Result<Cow<'_, [f64]>, MlError> {
    match &column.values {
        ColumnValues::Numeric(v) => Ok(Cow::Borrowed(v.as_slice())),
        ColumnValues::Categorical(v) => v
            .iter()
            .map(|cell| {
                let cell = cell.trim();
                if cell.is_empty() {
                    return Ok(f64::NAN);
                }
                cell.parse::<f64>().map_err(|_| {
                    MlError::schema_mismatch(format!(
                        "numerical column '{}' holds non-numeric value '{cell}'",
                        column.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Cow::Owned),
    }
}
