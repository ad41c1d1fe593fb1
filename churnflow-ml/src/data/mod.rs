//! Tabular data: the in-memory dataset, CSV reading, and ingestion.

pub mod dataset;
pub mod ingest;
pub mod reader;

pub use dataset::{Column, ColumnKind, ColumnValues, Dataset, DatasetBuilder};
pub use ingest::DataIngestion;
pub use reader::{parse_csv, read_csv};
