//! Result-set datasets, their paged row sources and row-free placeholders.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Weak},
};

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use shared::{
    domain::{BatchId, LinkType, ResultId},
    protocol::{DbCellValue, DbColumn, ResultSetSummary},
};
use tokio::sync::Mutex;

use crate::{
    format::{format_cell, html_entities, CellFormatter},
    menus::GRID_ICON_COUNT,
    services::DataService,
};

pub const WINDOW_SIZE: u64 = 50;
pub const ROW_HEIGHT: u32 = 29;
pub const DEFAULT_NUM_SHOWING_ROWS: u64 = 8;
const GRID_ICON_WIDTH: u32 = 30;
const GRID_PADDING: u32 = 10;

const XML_SHOWPLAN_COLUMN: &str = "Microsoft SQL Server 2005 XML Showplan";
const XML_SHOWPLAN_TITLE: &str = "XML Showplan";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridDataRow {
    pub values: Vec<DbCellValue>,
}

/// Paged accessor over one result set's rows.
pub struct RowSource {
    service: Arc<dyn DataService>,
    batch_id: BatchId,
    result_id: ResultId,
    total_rows: u64,
    window_size: u64,
    windows: Mutex<HashMap<u64, Vec<GridDataRow>>>,
}

impl RowSource {
    pub fn new(
        service: Arc<dyn DataService>,
        batch_id: BatchId,
        result_id: ResultId,
        total_rows: u64,
    ) -> Self {
        Self {
            service,
            batch_id,
            result_id,
            total_rows,
            window_size: WINDOW_SIZE,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn len(&self) -> u64 {
        self.total_rows
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    pub async fn fetch(&self, offset: u64, count: u64) -> Result<Vec<GridDataRow>> {
        let subset = self
            .service
            .fetch_rows(offset, count, self.batch_id, self.result_id)
            .await
            .with_context(|| {
                format!(
                    "failed to fetch rows {offset}..{} for batch {} result {}",
                    offset.saturating_add(count),
                    self.batch_id,
                    self.result_id
                )
            })?;
        Ok(subset
            .rows
            .into_iter()
            .map(|values| GridDataRow { values })
            .collect())
    }

    /// Rows `start..end`, loading any windows not yet cached. Indices past the
    /// end of the result set are clipped.
    pub async fn rows(&self, start: u64, end: u64) -> Result<Vec<GridDataRow>> {
        let end = end.min(self.total_rows);
        if start >= end {
            return Ok(Vec::new());
        }

        let first_window = start / self.window_size;
        let last_window = (end - 1) / self.window_size;
        for window in first_window..=last_window {
            self.load_window(window).await?;
        }

        let windows = self.windows.lock().await;
        Ok((start..end)
            .map(|index| self.lookup(&windows, index).unwrap_or_default())
            .collect())
    }

    /// Cached row at `index`, or an empty placeholder row when not loaded.
    pub async fn cached_row(&self, index: u64) -> GridDataRow {
        let windows = self.windows.lock().await;
        self.lookup(&windows, index).unwrap_or_default()
    }

    pub async fn loaded_windows(&self) -> usize {
        self.windows.lock().await.len()
    }

    async fn load_window(&self, window: u64) -> Result<()> {
        if self.windows.lock().await.contains_key(&window) {
            return Ok(());
        }
        let offset = window * self.window_size;
        let count = self.window_size.min(self.total_rows.saturating_sub(offset));
        let rows = self.fetch(offset, count).await?;
        self.windows.lock().await.insert(window, rows);
        Ok(())
    }

    fn lookup(&self, windows: &HashMap<u64, Vec<GridDataRow>>, index: u64) -> Option<GridDataRow> {
        if index >= self.total_rows {
            return None;
        }
        windows
            .get(&(index / self.window_size))
            .and_then(|rows| rows.get((index % self.window_size) as usize))
            .cloned()
    }
}

impl fmt::Debug for RowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSource")
            .field("batch_id", &self.batch_id)
            .field("result_id", &self.result_id)
            .field("total_rows", &self.total_rows)
            .field("window_size", &self.window_size)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHeight {
    Pixels(u32),
    Inherit,
}

impl fmt::Display for RenderHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderHeight::Pixels(px) => write!(f, "{px}px"),
            RenderHeight::Inherit => f.write_str("inherit"),
        }
    }
}

impl Serialize for RenderHeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RenderHeight::Pixels(px) => serializer.serialize_u32(*px),
            RenderHeight::Inherit => serializer.serialize_str("inherit"),
        }
    }
}

/// `(min, max)` render height for a grid with `row_count` rows.
pub fn height_bounds(row_count: u64) -> (RenderHeight, RenderHeight) {
    if row_count < DEFAULT_NUM_SHOWING_ROWS {
        let rows_px = (row_count as u32 + 1) * ROW_HEIGHT;
        let icon_bar_px = GRID_ICON_COUNT as u32 * GRID_ICON_WIDTH;
        let px = RenderHeight::Pixels(rows_px.max(icon_bar_px) + GRID_PADDING);
        (px, px)
    } else {
        let min = (DEFAULT_NUM_SHOWING_ROWS as u32 + 1) * ROW_HEIGHT + GRID_PADDING;
        (RenderHeight::Pixels(min), RenderHeight::Inherit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    pub formatter: CellFormatter,
    pub link_type: Option<LinkType>,
}

impl ColumnDefinition {
    pub fn from_db_column(index: usize, column: &DbColumn) -> Self {
        let name = if column.column_name == XML_SHOWPLAN_COLUMN {
            XML_SHOWPLAN_TITLE.to_string()
        } else {
            html_entities(&column.column_name)
        };
        let link_type = if column.is_xml {
            Some(LinkType::Xml)
        } else if column.is_json {
            Some(LinkType::Json)
        } else {
            None
        };
        Self {
            id: index.to_string(),
            name,
            field_type: FieldType::String,
            formatter: if link_type.is_some() {
                CellFormatter::HyperLink
            } else {
                CellFormatter::Text
            },
            link_type,
        }
    }

    pub fn format(&self, value: Option<&DbCellValue>) -> String {
        format_cell(self.formatter, value)
    }
}

#[derive(Debug)]
pub struct GridDataSet {
    pub batch_id: BatchId,
    pub result_id: ResultId,
    pub total_rows: u64,
    pub columns: Arc<[ColumnDefinition]>,
    pub min_height: RenderHeight,
    pub max_height: RenderHeight,
    pub rows: Arc<RowSource>,
}

impl GridDataSet {
    pub fn from_summary(summary: &ResultSetSummary, service: Arc<dyn DataService>) -> Self {
        let (min_height, max_height) = height_bounds(summary.row_count);
        let columns: Arc<[ColumnDefinition]> = summary
            .column_info
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnDefinition::from_db_column(index, column))
            .collect();
        Self {
            batch_id: summary.batch_id,
            result_id: summary.id,
            total_rows: summary.row_count,
            columns,
            min_height,
            max_height,
            rows: Arc::new(RowSource::new(
                service,
                summary.batch_id,
                summary.id,
                summary.row_count,
            )),
        }
    }
}

/// Row-free twin of a [`GridDataSet`]; mounted only while its rows are attached.
#[derive(Debug, Clone)]
pub struct PlaceholderDataSet {
    pub batch_id: BatchId,
    pub result_id: ResultId,
    pub total_rows: u64,
    pub columns: Arc<[ColumnDefinition]>,
    pub min_height: RenderHeight,
    pub max_height: RenderHeight,
    rows: Option<Weak<RowSource>>,
}

impl PlaceholderDataSet {
    pub fn detached(dataset: &GridDataSet) -> Self {
        Self {
            batch_id: dataset.batch_id,
            result_id: dataset.result_id,
            total_rows: dataset.total_rows,
            columns: Arc::clone(&dataset.columns),
            min_height: dataset.min_height,
            max_height: dataset.max_height,
            rows: None,
        }
    }

    /// Returns true when the placeholder was previously detached.
    pub fn attach(&mut self, dataset: &GridDataSet) -> bool {
        let was_detached = !self.is_attached();
        self.rows = Some(Arc::downgrade(&dataset.rows));
        was_detached
    }

    pub fn detach(&mut self) {
        self.rows = None;
    }

    pub fn is_attached(&self) -> bool {
        self.rows
            .as_ref()
            .is_some_and(|rows| rows.strong_count() > 0)
    }

    pub fn row_source(&self) -> Option<Arc<RowSource>> {
        self.rows.as_ref().and_then(Weak::upgrade)
    }
}

#[cfg(test)]
#[path = "tests/dataset_tests.rs"]
mod tests;
