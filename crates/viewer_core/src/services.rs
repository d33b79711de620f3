//! Collaborator seams: data service, host grid surface, text selection and clipboard.

use std::cmp::{max, min};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{BatchId, LinkType, ResultId, SaveFormat, SelectionData, SelectionRange},
    protocol::ResultSetSubset,
};

use crate::{config::ViewerConfig, layout::LayoutMetrics};

#[async_trait]
pub trait DataService: Send + Sync {
    async fn config(&self) -> Result<ViewerConfig>;
    async fn fetch_rows(
        &self,
        offset: u64,
        count: u64,
        batch_id: BatchId,
        result_id: ResultId,
    ) -> Result<ResultSetSubset>;
    async fn copy_results(
        &self,
        selection: Option<Vec<SelectionRange>>,
        batch_id: BatchId,
        result_id: ResultId,
        include_headers: bool,
    ) -> Result<()>;
    async fn send_save_request(
        &self,
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    ) -> Result<()>;
    async fn open_link(&self, value: &str, column_name: &str, link_type: LinkType) -> Result<()>;
    async fn set_editor_selection(&self, selection: SelectionData) -> Result<()>;
    async fn send_ready_event(&self, uri: &str) -> Result<()>;
    async fn show_warning(&self, message: &str) -> Result<()>;
}

/// Host-side grid and pane layer. Grid indices are positions in the rendered list.
pub trait GridSurface: Send + Sync {
    fn selected_ranges(&self, grid: usize) -> Vec<SelectionRange>;
    fn set_active(&self, grid: usize);
    fn set_active_cell(&self, grid: usize, row: usize, cell: usize);
    fn set_select_all(&self, grid: usize, selected: bool);
    fn notify_resized(&self, grid: usize);
    fn scroll_results_to(&self, scroll_top: f64);
    fn scroll_messages_to_bottom(&self);
    fn set_messages_selectable(&self, selectable: bool);
    fn set_results_height(&self, height: f64);
    fn set_messages_min_height(&self, height: f64);
    fn metrics(&self) -> LayoutMetrics;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRegion {
    Messages,
}

/// Character span within the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: min(a, b),
            end: max(a, b),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn intersection(&self, other: &TextRange) -> Option<TextRange> {
        let start = max(self.start, other.start);
        let end = min(self.end, other.end);
        (start < end).then_some(TextRange { start, end })
    }
}

pub trait TextSelectionProvider: Send + Sync {
    fn get_selection(&self) -> Vec<TextRange>;
    fn create_range(&self, region: TextRegion) -> Option<TextRange>;
    fn clear_selection(&self);
    fn text(&self, range: &TextRange) -> String;
}

pub trait Clipboard: Send + Sync {
    fn copy_text(&self, text: &str) -> Result<()>;
}
