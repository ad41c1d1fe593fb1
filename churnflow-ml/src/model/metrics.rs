//! Classification metrics over predicted probabilities.

use ndarray::{Array1, Array2, Axis};

/// Fraction of rows whose most probable class equals the label.
/// `None` for an empty set.
pub fn accuracy(proba: &Array2<f64>, y: &Array1<usize>) -> Option<f64> {
    if y.is_empty() {
        return None;
    }
    let correct = proba
        .axis_iter(Axis(0))
        .zip(y)
        .filter(|(row, label)| argmax(row.iter().copied()) == Some(**label))
        .count();
    Some(correct as f64 / y.len() as f64)
}

/// Mean cross-entropy with probabilities clipped to `[1e-15, 1 - 1e-15]`.
pub fn log_loss(proba: &Array2<f64>, y: &Array1<usize>) -> Option<f64> {
    if y.is_empty() {
        return None;
    }
    let eps = 1e-15;
    let total: f64 = y
        .iter()
        .enumerate()
        .map(|(i, &label)| proba[[i, label]].clamp(eps, 1.0 - eps).ln())
        .sum();
    Some(-total / y.len() as f64)
}

fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
