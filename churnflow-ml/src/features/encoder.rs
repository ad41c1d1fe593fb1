//! Categorical encoders: one-hot for features, ordinal for labels.

use crate::data::dataset::{ColumnValues, format_number};
use crate::error::MlError;
use ndarray::{Array1, ArrayViewMut2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One-hot encoder with a fixed, sorted vocabulary per column.
///
/// Values outside a column's vocabulary encode as an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    vocabularies: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learn each column's vocabulary from observed values, sorted ascending.
    pub fn fit<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let (columns, vocabularies) = columns
            .into_iter()
            .map(|(name, values)| {
                let vocabulary: BTreeSet<&String> = values.iter().collect();
                (
                    name.to_string(),
                    vocabulary.into_iter().cloned().collect::<Vec<_>>(),
                )
            })
            .unzip();
        Self {
            columns,
            vocabularies,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(&self.vocabularies[idx])
    }

    /// Width of the block for the column at `index`.
    pub fn block_width(&self, index: usize) -> usize {
        self.vocabularies[index].len()
    }

    /// Total number of indicator columns.
    pub fn n_outputs(&self) -> usize {
        self.vocabularies.iter().map(Vec::len).sum()
    }

    /// `<column>_<category>` for every indicator, in output order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.vocabularies)
            .flat_map(|(column, vocab)| vocab.iter().map(move |v| format!("{column}_{v}")))
            .collect()
    }

    /// Write indicators for the column at `index` into `block`, which must be
    /// zero-initialized with one row per value and `block_width(index)` columns.
    pub fn encode_into(&self, index: usize, values: &[String], mut block: ArrayViewMut2<'_, f64>) {
        let vocabulary = &self.vocabularies[index];
        for (row, value) in values.iter().enumerate() {
            if let Ok(pos) = vocabulary.binary_search(value) {
                block[[row, pos]] = 1.0;
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MlError> {
        if self.columns.len() != self.vocabularies.len() {
            return Err(MlError::artifact(format!(
                "encoder has {} columns but {} vocabularies",
                self.columns.len(),
                self.vocabularies.len()
            )));
        }
        for (column, vocab) in self.columns.iter().zip(&self.vocabularies) {
            if vocab.windows(2).any(|w| w[0] >= w[1]) {
                return Err(MlError::artifact(format!(
                    "vocabulary of '{column}' is not strictly sorted"
                )));
            }
        }
        Ok(())
    }
}

/// Maps label values to integers by ascending sort of the distinct values.
///
/// String labels sort lexicographically, numeric labels numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(column: &str, values: &ColumnValues) -> Result<Self, MlError> {
        let classes = match values {
            ColumnValues::Categorical(v) => v
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect(),
            ColumnValues::Numeric(v) => {
                if v.iter().any(|x| !x.is_finite()) {
                    return Err(MlError::dataset(format!(
                        "label column '{column}' contains missing or infinite values"
                    )));
                }
                // `+ 0.0` folds -0.0 into 0.0 before the total-order sort.
                let mut sorted: Vec<f64> = v.iter().map(|x| x + 0.0).collect();
                sorted.sort_by(f64::total_cmp);
                sorted.dedup();
                sorted.into_iter().map(format_number).collect()
            }
        };
        Ok(Self {
            column: column.to_string(),
            classes,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Distinct labels in encoding order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, values: &ColumnValues) -> Result<Array1<usize>, MlError> {
        let index: HashMap<&str, usize> = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        values
            .as_categories()
            .iter()
            .map(|v| {
                index.get(v.as_str()).copied().ok_or_else(|| {
                    MlError::dataset(format!("unknown label '{v}' in column '{}'", self.column))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }
}
