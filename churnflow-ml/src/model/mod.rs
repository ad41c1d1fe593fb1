//! Classifier interface, the softmax regression model, and training helpers.

pub mod metrics;
pub mod softmax;
pub mod split;

pub use metrics::{accuracy, log_loss};
pub use softmax::SoftmaxRegression;
pub use split::{Split, train_test_split};

use crate::error::MlError;
use ndarray::{Array1, Array2};

/// A probabilistic classifier over encoded labels `0..n_classes`.
pub trait Classifier {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<(), MlError>;

    /// Per-class probabilities, one row per input row; rows sum to one.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError>;

    /// Number of classes, once fitted.
    fn n_classes(&self) -> Option<usize>;
}
