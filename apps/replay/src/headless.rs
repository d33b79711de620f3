//! Collaborators for running the viewer without a host UI.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::{
    domain::{BatchId, LinkType, ResultId, SaveFormat, SelectionData, SelectionRange},
    protocol::{DbCellValue, ResultSetSubset},
};
use tracing::{debug, info, warn};
use viewer_core::{
    config::ViewerConfig,
    layout::LayoutMetrics,
    services::{Clipboard, DataService, GridSurface, TextRange, TextRegion, TextSelectionProvider},
};

/// Serves rows registered by the replay script and logs outbound requests.
pub struct ScriptedDataService {
    config: ViewerConfig,
    rows: Mutex<HashMap<(BatchId, ResultId), Vec<Vec<DbCellValue>>>>,
}

impl ScriptedDataService {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_rows(&self, batch_id: BatchId, result_id: ResultId, rows: Vec<Vec<DbCellValue>>) {
        if let Ok(mut guard) = self.rows.lock() {
            guard.insert((batch_id, result_id), rows);
        }
    }
}

#[async_trait]
impl DataService for ScriptedDataService {
    async fn config(&self) -> Result<ViewerConfig> {
        Ok(self.config.clone())
    }

    async fn fetch_rows(
        &self,
        offset: u64,
        count: u64,
        batch_id: BatchId,
        result_id: ResultId,
    ) -> Result<ResultSetSubset> {
        let Ok(guard) = self.rows.lock() else {
            bail!("row table poisoned");
        };
        let Some(rows) = guard.get(&(batch_id, result_id)) else {
            bail!("no rows scripted for batch {batch_id} result {result_id}");
        };
        let start = (offset as usize).min(rows.len());
        let end = (offset.saturating_add(count) as usize).min(rows.len());
        debug!(batch_id = batch_id.0, result_id = result_id.0, offset, count, "serving rows");
        Ok(ResultSetSubset {
            row_count: (end - start) as u64,
            rows: rows[start..end].to_vec(),
        })
    }

    async fn copy_results(
        &self,
        selection: Option<Vec<SelectionRange>>,
        batch_id: BatchId,
        result_id: ResultId,
        include_headers: bool,
    ) -> Result<()> {
        info!(
            batch_id = batch_id.0,
            result_id = result_id.0,
            include_headers,
            ranges = selection.as_ref().map(Vec::len),
            "copy results"
        );
        Ok(())
    }

    async fn send_save_request(
        &self,
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    ) -> Result<()> {
        info!(
            batch_id = batch_id.0,
            result_id = result_id.0,
            %format,
            ranges = selection.len(),
            "save results"
        );
        Ok(())
    }

    async fn open_link(&self, value: &str, column_name: &str, link_type: LinkType) -> Result<()> {
        info!(column_name, link_type = link_type.as_str(), bytes = value.len(), "open link");
        Ok(())
    }

    async fn set_editor_selection(&self, selection: SelectionData) -> Result<()> {
        info!(
            start_line = selection.start_line,
            end_line = selection.end_line,
            "set editor selection"
        );
        Ok(())
    }

    async fn send_ready_event(&self, uri: &str) -> Result<()> {
        info!(uri, "ready");
        Ok(())
    }

    async fn show_warning(&self, message: &str) -> Result<()> {
        warn!("{message}");
        Ok(())
    }
}

/// Grid surface with scripted metrics; every call is logged at debug level.
pub struct HeadlessSurface {
    metrics: Mutex<LayoutMetrics>,
}

impl HeadlessSurface {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics: Mutex::new(metrics),
        }
    }

    pub fn set_metrics(&self, metrics: LayoutMetrics) {
        if let Ok(mut guard) = self.metrics.lock() {
            *guard = metrics;
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(LayoutMetrics {
            grid_height: 300.0,
            results_height: 600.0,
            scrollable_height: 622.0,
            window_height: 900.0,
            messages_height: 200.0,
        })
    }
}

impl GridSurface for HeadlessSurface {
    fn selected_ranges(&self, _grid: usize) -> Vec<SelectionRange> {
        Vec::new()
    }

    fn set_active(&self, grid: usize) {
        debug!(grid, "set active");
    }

    fn set_active_cell(&self, grid: usize, row: usize, cell: usize) {
        debug!(grid, row, cell, "set active cell");
    }

    fn set_select_all(&self, grid: usize, selected: bool) {
        debug!(grid, selected, "select all");
    }

    fn notify_resized(&self, grid: usize) {
        debug!(grid, "resized");
    }

    fn scroll_results_to(&self, scroll_top: f64) {
        debug!(scroll_top, "scroll results");
    }

    fn scroll_messages_to_bottom(&self) {
        debug!("scroll messages to bottom");
    }

    fn set_messages_selectable(&self, selectable: bool) {
        debug!(selectable, "messages selectable");
    }

    fn set_results_height(&self, height: f64) {
        debug!(height, "results height");
    }

    fn set_messages_min_height(&self, height: f64) {
        debug!(height, "messages min height");
    }

    fn metrics(&self) -> LayoutMetrics {
        self.metrics
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }
}

pub struct NoTextSelection;

impl TextSelectionProvider for NoTextSelection {
    fn get_selection(&self) -> Vec<TextRange> {
        Vec::new()
    }

    fn create_range(&self, _region: TextRegion) -> Option<TextRange> {
        None
    }

    fn clear_selection(&self) {}

    fn text(&self, _range: &TextRange) -> String {
        String::new()
    }
}

pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        println!("clipboard: {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_rows_are_clipped_to_available() {
        let service = ScriptedDataService::new(ViewerConfig::default());
        service.register_rows(
            BatchId(0),
            ResultId(1),
            (0..3).map(|i| vec![DbCellValue::new(i.to_string())]).collect(),
        );
        let subset = service
            .fetch_rows(2, 50, BatchId(0), ResultId(1))
            .await
            .expect("rows");
        assert_eq!(subset.row_count, 1);
        assert_eq!(subset.rows[0][0].display_value, "2");

        let err = service
            .fetch_rows(0, 1, BatchId(0), ResultId(9))
            .await
            .expect_err("unknown result set");
        assert!(err.to_string().contains("result 9"));
    }
}
