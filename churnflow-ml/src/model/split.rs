//! Seeded random train/validation split.

use crate::error::MlError;
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Rows partitioned into training and validation parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<usize>,
}

/// Shuffle row indices with a seeded RNG and hold out
/// `ceil(n * test_size)` rows, leaving at least one row for training.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<usize>,
    test_size: f64,
    seed: u64,
) -> Result<Split, MlError> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(MlError::invalid_input(format!(
            "test_size must be in [0, 1), got {test_size}"
        )));
    }
    if x.nrows() != y.len() {
        return Err(MlError::invalid_input(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }

    let n = x.nrows();
    let n_test = ((n as f64 * test_size).ceil() as usize).min(n.saturating_sub(1));

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test, train) = indices.split_at(n_test);

    Ok(Split {
        x_train: x.select(Axis(0), train),
        y_train: y.select(Axis(0), train),
        x_test: x.select(Axis(0), test),
        y_test: y.select(Axis(0), test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn data(n: usize) -> (Array2<f64>, Array1<usize>) {
        let x = Array::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array1::from_iter((0..n).map(|i| i % 2));
        (x, y)
    }

    #[test]
    fn test_sizes() {
        let (x, y) = data(10);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.x_test.nrows(), 2);
        assert_eq!(split.x_train.nrows(), 8);
        assert_eq!(split.y_train.len(), 8);

        let split = train_test_split(&x, &y, 0.25, 42).unwrap();
        assert_eq!(split.x_test.nrows(), 3);
    }

    #[test]
    fn test_keeps_one_training_row() {
        let (x, y) = data(2);
        let split = train_test_split(&x, &y, 0.9, 7).unwrap();
        assert_eq!(split.x_train.nrows(), 1);
        assert_eq!(split.x_test.nrows(), 1);

        let (x, y) = data(1);
        let split = train_test_split(&x, &y, 0.5, 7).unwrap();
        assert_eq!(split.x_train.nrows(), 1);
        assert_eq!(split.x_test.nrows(), 0);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let (x, y) = data(20);
        let a = train_test_split(&x, &y, 0.3, 42).unwrap();
        let b = train_test_split(&x, &y, 0.3, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rows_stay_aligned() {
        let (x, y) = data(12);
        let split = train_test_split(&x, &y, 0.5, 3).unwrap();
        for (row, &label) in split.x_test.rows().into_iter().zip(&split.y_test) {
            let original = (row[0] / 2.0) as usize;
            assert_eq!(label, original % 2);
        }
    }

    #[test]
    fn test_rejects_bad_test_size() {
        let (x, y) = data(4);
        assert!(train_test_split(&x, &y, 1.0, 0).is_err());
        assert!(train_test_split(&x, &y, -0.1, 0).is_err());
    }
}
