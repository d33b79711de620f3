use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("no rendered grid at index {index} ({rendered} rendered)")]
    NoSuchGrid { index: usize, rendered: usize },
    #[error("grid {grid} has no column {column}")]
    NoSuchColumn { grid: usize, column: usize },
    #[error("column {column} of grid {grid} is not a link column")]
    NotALinkColumn { grid: usize, column: usize },
    #[error("rows of grid {grid} are not mounted")]
    RowsNotMounted { grid: usize },
    #[error("grid {grid} has no row {row} ({total} rows)")]
    NoSuchRow { grid: usize, row: u64, total: u64 },
}
