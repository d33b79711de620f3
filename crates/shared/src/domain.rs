use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(BatchId);
id_newtype!(ResultId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    Csv,
    Json,
    Excel,
}

impl SaveFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveFormat::Csv => "csv",
            SaveFormat::Json => "json",
            SaveFormat::Excel => "excel",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Xml,
    Json,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Xml => "xml",
            LinkType::Json => "json",
        }
    }
}

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub from_row: usize,
    pub from_cell: usize,
    pub to_row: usize,
    pub to_cell: usize,
}

impl SelectionRange {
    pub fn new(from_row: usize, from_cell: usize, to_row: usize, to_cell: usize) -> Self {
        Self {
            from_row,
            from_cell,
            to_row,
            to_cell,
        }
    }

    pub fn single_cell(row: usize, cell: usize) -> Self {
        Self::new(row, cell, row, cell)
    }

    pub fn contains(&self, row: usize, cell: usize) -> bool {
        row >= self.from_row && row <= self.to_row && cell >= self.from_cell && cell <= self.to_cell
    }
}

/// Span of source text in the editor that produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionData {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}
