//! CSV reading with per-column kind inference.
//!
//! A column is numeric when it has at least one non-empty cell and every
//! non-empty cell parses as `f64`; empty cells in a numeric column become
//! `NaN`. Every other column is categorical. Either way the cells are kept
//! verbatim, so numeric columns still compare as the text that was read.

use crate::data::dataset::{Column, Dataset};
use crate::error::MlError;
use std::path::Path;

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<Dataset, MlError> {
    let bytes = std::fs::read(path)
        .map_err(|e| MlError::dataset(format!("failed to read {}: {e}", path.display())))?;
    let dataset = parse_csv(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "Read CSV dataset"
    );
    Ok(dataset)
}

/// Parse CSV bytes with a header row.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset, MlError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(MlError::dataset("CSV has no header row"));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, cell) in cells.iter_mut().zip(record.iter()) {
            column.push(cell.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();
    Dataset::new(columns)
}

fn infer_column(name: String, raw: Vec<String>) -> Column {
    let mut parsed = Vec::with_capacity(raw.len());
    let mut any_value = false;
    for cell in &raw {
        if cell.is_empty() {
            parsed.push(f64::NAN);
            continue;
        }
        match cell.parse::<f64>() {
            Ok(x) => {
                any_value = true;
                parsed.push(x);
            }
            Err(_) => return Column::categorical(name, raw),
        }
    }

    if any_value {
        Column::numeric(name, parsed).with_text(raw)
    } else {
        Column::categorical(name, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{ColumnKind, ColumnValues};

    #[test]
    fn test_infers_kinds() {
        let ds = parse_csv(b"cust_id,count_total,country,churn\n1,10,A,Yes\n2,20.5,B,No\n").unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.column("cust_id").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(
            ds.column("count_total").unwrap().values,
            ColumnValues::Numeric(vec![10.0, 20.5])
        );
        assert_eq!(ds.column("country").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("churn").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_empty_numeric_cells_are_nan() {
        let ds = parse_csv(b"a,b\n1,x\n,y\n").unwrap();
        match &ds.column("a").unwrap().values {
            ColumnValues::Numeric(v) => {
                assert_eq!(v[0], 1.0);
                assert!(v[1].is_nan());
            }
            other => panic!("expected numeric, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_column_keeps_source_text() {
        let ds = parse_csv(b"zip\n01\n1.50\n").unwrap();
        let zip = ds.column("zip").unwrap();
        assert_eq!(zip.values, ColumnValues::Numeric(vec![1.0, 1.5]));
        assert_eq!(zip.text, Some(vec!["01".to_string(), "1.50".to_string()]));
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let ds = parse_csv(b"plan\n12\nbasic\n").unwrap();
        assert_eq!(
            ds.column("plan").unwrap().values,
            ColumnValues::Categorical(vec!["12".into(), "basic".into()])
        );
    }

    #[test]
    fn test_all_empty_column_is_categorical() {
        let ds = parse_csv(b"a,note\n1,\n2,\n").unwrap();
        assert_eq!(ds.column("note").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_header_only() {
        let ds = parse_csv(b"a,b\n").unwrap();
        assert_eq!(ds.n_rows(), 0);
        assert_eq!(ds.n_columns(), 2);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = parse_csv(b"a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, MlError::Csv(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_csv(Path::new("/nonexistent/churn.csv")).unwrap_err();
        assert!(matches!(err, MlError::Dataset(_)));
    }
}
