//! In-memory tabular dataset.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

/// Value kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Cells of one column. Missing numeric cells are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Cell `row` as text. Numbers use their shortest display form
    /// (`1.0` renders as `1`); `NaN` renders empty.
    pub fn display(&self, row: usize) -> Option<String> {
        match self {
            Self::Numeric(v) => v.get(row).map(|x| format_number(*x)),
            Self::Categorical(v) => v.get(row).cloned(),
        }
    }

    /// All cells as category strings.
    pub fn as_categories(&self) -> Cow<'_, [String]> {
        match self {
            Self::Categorical(v) => Cow::Borrowed(v.as_slice()),
            Self::Numeric(v) => Cow::Owned(v.iter().map(|x| format_number(*x)).collect()),
        }
    }
}

// Signed zero renders as "0" so `-0.0` and `0.0` name the same category.
pub(crate) fn format_number(x: f64) -> String {
    if x.is_nan() {
        String::new()
    } else if x == 0.0 {
        "0".to_string()
    } else {
        x.to_string()
    }
}

/// A named column.
///
/// Columns parsed from text keep the source cells in `text`, so a numeric
/// column can still be matched as categories exactly as written (`"01"`
/// stays `"01"`, not `"1"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
            text: None,
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values.into_iter().map(Into::into).collect()),
            text: None,
        }
    }

    /// Attach the source text of each cell.
    pub fn with_text(mut self, text: Vec<String>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }

    /// Cell `row` as written in the source, falling back to the display form.
    pub fn display(&self, row: usize) -> Option<String> {
        match &self.text {
            Some(text) => text.get(row).cloned(),
            None => self.values.display(row),
        }
    }

    /// All cells as category strings, preferring the source text.
    pub fn categories(&self) -> Cow<'_, [String]> {
        match &self.text {
            Some(text) => Cow::Borrowed(text.as_slice()),
            None => self.values.as_categories(),
        }
    }
}

/// A rectangular table of uniquely named, typed columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate names and ragged columns.
    pub fn new(columns: Vec<Column>) -> Result<Self, MlError> {
        let n_rows = columns.first().map_or(0, |c| c.values.len());
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(MlError::dataset(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if column.values.len() != n_rows {
                return Err(MlError::dataset(format!(
                    "column '{}' has {} rows, expected {n_rows}",
                    column.name,
                    column.values.len()
                )));
            }
            if column.text.as_ref().is_some_and(|t| t.len() != n_rows) {
                return Err(MlError::dataset(format!(
                    "column '{}' source text does not match its {n_rows} rows",
                    column.name
                )));
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Column-by-column dataset construction.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    columns: Vec<Column>,
}

impl DatasetBuilder {
    pub fn numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push(Column::numeric(name, values));
        self
    }

    pub fn categorical<S: Into<String>>(mut self, name: impl Into<String>, values: Vec<S>) -> Self {
        self.columns.push(Column::categorical(name, values));
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<Dataset, MlError> {
        Dataset::new(self.columns)
    }
}
