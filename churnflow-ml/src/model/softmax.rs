//! Multinomial logistic regression trained by batch gradient descent.

use crate::error::MlError;
use crate::model::Classifier;
use churnflow_core::ClassifierParams;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Softmax regression over `n_classes` classes.
///
/// Missing feature values (`NaN`) are read as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    params: ClassifierParams,
    /// `(n_features, n_classes)`.
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
    #[serde(default)]
    loss_history: Vec<f64>,
}

impl Default for SoftmaxRegression {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

impl SoftmaxRegression {
    pub fn new(params: ClassifierParams) -> Self {
        Self {
            params,
            weights: None,
            bias: None,
            loss_history: Vec::new(),
        }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.weights.as_ref()
    }

    pub fn bias(&self) -> Option<&Array1<f64>> {
        self.bias.as_ref()
    }

    /// Training loss per iteration of the last `fit`.
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some() && self.bias.is_some()
    }

    fn logits(x: &Array2<f64>, weights: &Array2<f64>, bias: &Array1<f64>) -> Array2<f64> {
        x.mapv(|v| if v.is_nan() { 0.0 } else { v }).dot(weights) + bias
    }

    /// Row-wise softmax, shifted by the row maximum.
    fn softmax(mut logits: Array2<f64>) -> Array2<f64> {
        for mut row in logits.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        logits
    }

    fn cross_entropy(probs: &Array2<f64>, y: &Array1<usize>) -> f64 {
        let eps = 1e-15;
        let n = y.len() as f64;
        -y.iter()
            .enumerate()
            .map(|(i, &class)| probs[[i, class]].max(eps).ln())
            .sum::<f64>()
            / n
    }
}

impl Classifier for SoftmaxRegression {
    fn name(&self) -> &str {
        "softmax_regression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<(), MlError> {
        if x.nrows() == 0 {
            return Err(MlError::model("cannot fit on zero rows"));
        }
        if x.nrows() != y.len() {
            return Err(MlError::invalid_input(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if n_classes == 0 {
            return Err(MlError::invalid_input("n_classes must be at least 1"));
        }
        if let Some(&class) = y.iter().find(|&&c| c >= n_classes) {
            return Err(MlError::invalid_input(format!(
                "label {class} out of range for {n_classes} classes"
            )));
        }

        let n = x.nrows() as f64;
        let x_clean = x.mapv(|v| if v.is_nan() { 0.0 } else { v });
        let mut one_hot = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (i, &class) in y.iter().enumerate() {
            one_hot[[i, class]] = 1.0;
        }

        let ClassifierParams {
            learning_rate,
            max_iter,
            tolerance,
            l2,
        } = self.params.clone();

        let mut weights = Array2::<f64>::zeros((x.ncols(), n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);
        self.loss_history.clear();

        for iter in 0..max_iter {
            let probs = Self::softmax(x_clean.dot(&weights) + &bias);
            let penalty = 0.5 * l2 * weights.mapv(|w| w * w).sum();
            let loss = Self::cross_entropy(&probs, y) + penalty;

            let errors = probs - &one_hot;
            let dw = x_clean.t().dot(&errors) / n + &weights * l2;
            let db = errors.sum_axis(Axis(0)) / n;
            weights -= &(dw * learning_rate);
            bias -= &(db * learning_rate);

            let converged = self
                .loss_history
                .last()
                .is_some_and(|prev| (prev - loss).abs() < tolerance);
            self.loss_history.push(loss);
            if converged {
                tracing::debug!(iter, loss, "Softmax regression converged");
                break;
            }
        }

        tracing::debug!(
            iterations = self.loss_history.len(),
            final_loss = self.loss_history.last().copied().unwrap_or(f64::NAN),
            "Softmax regression fitted"
        );
        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        let (Some(weights), Some(bias)) = (&self.weights, &self.bias) else {
            return Err(MlError::state("predict_proba called before the model was fitted"));
        };
        if x.ncols() != weights.nrows() {
            return Err(MlError::schema_mismatch(format!(
                "model expects {} features, got {}",
                weights.nrows(),
                x.ncols()
            )));
        }
        Ok(Self::softmax(Self::logits(x, weights, bias)))
    }

    fn n_classes(&self) -> Option<usize> {
        self.bias.as_ref().map(Array1::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<usize>) {
        let x = array![[0.0, 0.1], [0.1, 0.0], [0.9, 1.0], [1.0, 0.9]];
        let y = array![0, 0, 1, 1];
        (x, y)
    }

    #[test]
    fn test_predict_before_fit_is_state_error() {
        let model = SoftmaxRegression::default();
        let err = model.predict_proba(&array![[0.0, 1.0]]).unwrap_err();
        assert!(matches!(err, MlError::State(_)));
        assert_eq!(model.n_classes(), None);
    }

    #[test]
    fn test_learns_separable_classes() {
        let (x, y) = separable();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y, 2).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        for (row, &label) in proba.rows().into_iter().zip(&y) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row[label] > 0.5);
        }
        let history = model.loss_history();
        assert!(history.last().unwrap() < history.first().unwrap());
    }

    #[test]
    fn test_three_classes_sum_to_one() {
        let x = array![[0.0], [0.5], [1.0]];
        let y = array![0, 1, 2];
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y, 3).unwrap();
        let proba = model.predict_proba(&array![[0.2], [f64::NAN]]).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(model.n_classes(), Some(3));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = separable();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y, 2).unwrap();
        let err = model.predict_proba(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, MlError::SchemaMismatch(_)));
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let (x, _) = separable();
        let mut model = SoftmaxRegression::default();
        let err = model.fit(&x, &array![0, 1, 2, 0], 2).unwrap_err();
        assert!(matches!(err, MlError::InvalidInput(_)));
    }

    #[test]
    fn test_serde_preserves_predictions() {
        let (x, y) = separable();
        let mut model = SoftmaxRegression::default();
        model.fit(&x, &y, 2).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: SoftmaxRegression = serde_json::from_str(&json).unwrap();
        let before = model.predict_proba(&x).unwrap();
        let after = restored.predict_proba(&x).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
