//! Min/max range scaling of numerical columns.

use crate::error::MlError;
use ndarray::ArrayViewMut1;
use serde::{Deserialize, Serialize};

/// Per-column observed bounds, applied as `(x - min) / (max - min)`.
///
/// Values outside the fitted range are not clamped. A zero range divides
/// by one, so a constant column maps to `x - min`. `NaN` passes through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    columns: Vec<String>,
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Learn bounds from `(name, values)` pairs, ignoring `NaN`.
    pub fn fit<'a, I>(columns: I) -> Result<Self, MlError>
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        let mut scaler = Self {
            columns: Vec::new(),
            data_min: Vec::new(),
            data_max: Vec::new(),
        };
        for (name, values) in columns {
            if values.iter().any(|x| x.is_infinite()) {
                return Err(MlError::dataset(format!(
                    "numerical column '{name}' contains infinite values"
                )));
            }
            let (min, max) = values
                .iter()
                .filter(|x| !x.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                });
            if min > max {
                return Err(MlError::dataset(format!(
                    "numerical column '{name}' has no values to fit"
                )));
            }
            scaler.columns.push(name.to_string());
            scaler.data_min.push(min);
            scaler.data_max.push(max);
        }
        Ok(scaler)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fitted `(min, max)` of a column.
    pub fn bounds(&self, column: &str) -> Option<(f64, f64)> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some((self.data_min[idx], self.data_max[idx]))
    }

    /// Scale one value of the column at `index`.
    pub fn scale(&self, index: usize, x: f64) -> f64 {
        let min = self.data_min[index];
        let range = self.data_max[index] - min;
        let range = if range == 0.0 { 1.0 } else { range };
        (x - min) / range
    }

    /// Scale `values` of the column at `index` into `out`.
    pub fn scale_into(&self, index: usize, values: &[f64], mut out: ArrayViewMut1<'_, f64>) {
        for (dst, &x) in out.iter_mut().zip(values) {
            *dst = self.scale(index, x);
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MlError> {
        if self.data_min.len() != self.columns.len() || self.data_max.len() != self.columns.len() {
            return Err(MlError::artifact(format!(
                "scaler has {} columns but {} minima and {} maxima",
                self.columns.len(),
                self.data_min.len(),
                self.data_max.len()
            )));
        }
        Ok(())
    }
}
