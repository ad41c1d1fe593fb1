//! Stateful fit/transform wrapper around [`FeatureSchema`].

use crate::data::dataset::Dataset;
use crate::error::MlError;
use crate::features::schema::{ColumnRoles, FeatureSchema};
use churnflow_core::PreprocessConfig;
use ndarray::{Array1, Array2};

/// Result of [`FeatureTransformer::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutput {
    pub features: Array2<f64>,
    /// Encoded labels, when the dataset carried the label column.
    pub labels: Option<Array1<usize>>,
}

/// Learns a [`FeatureSchema`] at training time and reapplies it at
/// inference time.
#[derive(Debug, Clone, Default)]
pub struct FeatureTransformer {
    roles: ColumnRoles,
    schema: Option<FeatureSchema>,
}

impl FeatureTransformer {
    pub fn new(roles: ColumnRoles) -> Self {
        Self {
            roles,
            schema: None,
        }
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self::new(ColumnRoles::from_config(config))
    }

    /// A transformer ready to `transform` with a previously fitted schema.
    pub fn from_schema(schema: FeatureSchema) -> Self {
        Self {
            roles: schema.roles().clone(),
            schema: Some(schema),
        }
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    pub fn is_fitted(&self) -> bool {
        self.schema.is_some()
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn into_schema(self) -> Option<FeatureSchema> {
        self.schema
    }

    /// Learn a new schema from `dataset`, replacing any previous one, and
    /// return the transformed training matrix.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<FitOutput, MlError> {
        let schema = FeatureSchema::fit(self.roles.clone(), dataset)?;
        let features = schema.transform(dataset)?;
        let labels = schema.encode_labels(dataset)?;

        tracing::info!(
            rows = features.nrows(),
            features = features.ncols(),
            numerical = schema.numerical_columns().len(),
            categorical = schema.categorical_columns().len(),
            labelled = labels.is_some(),
            "Fitted feature schema"
        );

        self.schema = Some(schema);
        Ok(FitOutput { features, labels })
    }

    /// Apply the fitted schema to `dataset`.
    pub fn transform(&self, dataset: &Dataset) -> Result<Array2<f64>, MlError> {
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| MlError::state("transform called before fit or load"))?;
        let features = schema.transform(dataset)?;
        tracing::debug!(rows = features.nrows(), features = features.ncols(), "Transformed dataset");
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario() -> Dataset {
        Dataset::builder()
            .numeric("cust_id", vec![1.0, 2.0])
            .numeric("count_total", vec![10.0, 20.0])
            .categorical("country", vec!["A", "B"])
            .categorical("churn", vec!["Yes", "No"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_transform_before_fit_is_state_error() {
        let transformer = FeatureTransformer::default();
        assert!(!transformer.is_fitted());
        let err = transformer.transform(&scenario()).unwrap_err();
        assert!(matches!(err, MlError::State(_)));
    }

    #[test]
    fn test_churn_scenario() {
        let data = scenario();
        let mut transformer = FeatureTransformer::default();
        let fit = transformer.fit(&data).unwrap();

        assert_eq!(fit.features, ndarray::array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0]]);
        assert_eq!(fit.labels.unwrap().to_vec(), vec![1, 0]);
        assert_eq!(transformer.transform(&data).unwrap(), fit.features);
    }

    #[test]
    fn test_unlabelled_fit() {
        let data = Dataset::builder()
            .numeric("count_total", vec![1.0, 3.0])
            .build()
            .unwrap();
        let fit = FeatureTransformer::default().fit(&data).unwrap();
        assert!(fit.labels.is_none());
        assert_eq!(fit.features.dim(), (2, 1));
    }

    #[test]
    fn test_refit_replaces_schema() {
        let mut transformer = FeatureTransformer::default();
        transformer.fit(&scenario()).unwrap();

        let other = Dataset::builder()
            .categorical("plan", vec!["basic", "pro", "team"])
            .build()
            .unwrap();
        let fit = transformer.fit(&other).unwrap();
        let schema = transformer.schema().unwrap();

        assert_eq!(fit.features.ncols(), 3);
        assert!(schema.numerical_columns().is_empty());
        assert_eq!(schema.categorical_columns(), &["plan".to_string()][..]);
        assert!(transformer.transform(&scenario()).is_err());
    }

    #[test]
    fn test_from_schema_transforms_identically() {
        let data = scenario();
        let mut fitted = FeatureTransformer::default();
        let fit = fitted.fit(&data).unwrap();

        let restored = FeatureTransformer::from_schema(fitted.into_schema().unwrap());
        assert!(restored.is_fitted());
        assert_eq!(restored.transform(&data).unwrap(), fit.features);
    }
}
