use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{BatchId, LinkType, ResultId, SaveFormat, SelectionData, SelectionRange},
    protocol::{DataEvent, DbCellValue, DbColumn, ResultSetSubset, ResultSetSummary},
};
use tokio::sync::Notify;

use crate::{
    config::ViewerConfig,
    layout::LayoutMetrics,
    services::{Clipboard, DataService, GridSurface, TextRange, TextRegion, TextSelectionProvider},
    shortcuts::{KeyInput, KeymapShortcuts},
    ResultsView, ViewerServices,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Config,
    FetchRows {
        offset: u64,
        count: u64,
        batch_id: BatchId,
        result_id: ResultId,
    },
    CopyResults {
        selection: Option<Vec<SelectionRange>>,
        batch_id: BatchId,
        result_id: ResultId,
        include_headers: bool,
    },
    Save {
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    },
    OpenLink {
        value: String,
        column_name: String,
        link_type: LinkType,
    },
    EditorSelection(SelectionData),
    Ready(String),
    Warning(String),
}

/// Data service that records every call and serves synthetic `r{row}c{col}` rows.
pub struct FakeDataService {
    calls: Mutex<Vec<ServiceCall>>,
    config: ViewerConfig,
    fail_fetch: bool,
    fetch_gate: Option<Arc<Notify>>,
}

impl FakeDataService {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            config,
            fail_fetch: false,
            fetch_gate: None,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new(ViewerConfig::default()))
    }

    pub fn failing_fetch() -> Arc<Self> {
        Arc::new(Self {
            fail_fetch: true,
            ..Self::new(ViewerConfig::default())
        })
    }

    /// Row fetches wait for one `notify_one` on the returned gate each.
    pub fn gated_fetch() -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(Self {
            fetch_gate: Some(Arc::clone(&gate)),
            ..Self::new(ViewerConfig::default())
        });
        (service, gate)
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Calls other than row fetches and the startup handshake.
    pub fn requests(&self) -> Vec<ServiceCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    ServiceCall::FetchRows { .. } | ServiceCall::Config | ServiceCall::Ready(_)
                )
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl DataService for FakeDataService {
    async fn config(&self) -> Result<ViewerConfig> {
        self.record(ServiceCall::Config);
        Ok(self.config.clone())
    }

    async fn fetch_rows(
        &self,
        offset: u64,
        count: u64,
        batch_id: BatchId,
        result_id: ResultId,
    ) -> Result<ResultSetSubset> {
        self.record(ServiceCall::FetchRows {
            offset,
            count,
            batch_id,
            result_id,
        });
        if let Some(gate) = &self.fetch_gate {
            gate.notified().await;
        }
        if self.fail_fetch {
            return Err(anyhow!("row service offline"));
        }
        let rows = (offset..offset + count)
            .map(|row| {
                (0..2)
                    .map(|col| DbCellValue::new(format!("r{row}c{col}")))
                    .collect()
            })
            .collect();
        Ok(ResultSetSubset {
            row_count: count,
            rows,
        })
    }

    async fn copy_results(
        &self,
        selection: Option<Vec<SelectionRange>>,
        batch_id: BatchId,
        result_id: ResultId,
        include_headers: bool,
    ) -> Result<()> {
        self.record(ServiceCall::CopyResults {
            selection,
            batch_id,
            result_id,
            include_headers,
        });
        Ok(())
    }

    async fn send_save_request(
        &self,
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    ) -> Result<()> {
        self.record(ServiceCall::Save {
            batch_id,
            result_id,
            format,
            selection,
        });
        Ok(())
    }

    async fn open_link(&self, value: &str, column_name: &str, link_type: LinkType) -> Result<()> {
        self.record(ServiceCall::OpenLink {
            value: value.to_string(),
            column_name: column_name.to_string(),
            link_type,
        });
        Ok(())
    }

    async fn set_editor_selection(&self, selection: SelectionData) -> Result<()> {
        self.record(ServiceCall::EditorSelection(selection));
        Ok(())
    }

    async fn send_ready_event(&self, uri: &str) -> Result<()> {
        self.record(ServiceCall::Ready(uri.to_string()));
        Ok(())
    }

    async fn show_warning(&self, message: &str) -> Result<()> {
        self.record(ServiceCall::Warning(message.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SetActive(usize),
    SetActiveCell { grid: usize, row: usize, cell: usize },
    SelectAll { grid: usize, selected: bool },
    Resized(usize),
    ScrollResultsTo(f64),
    ScrollMessagesToBottom,
    MessagesSelectable(bool),
    ResultsHeight(f64),
    MessagesMinHeight(f64),
}

#[derive(Default)]
pub struct FakeSurface {
    calls: Mutex<Vec<SurfaceCall>>,
    selections: Mutex<HashMap<usize, Vec<SelectionRange>>>,
    metrics: Mutex<LayoutMetrics>,
}

impl FakeSurface {
    pub fn with_metrics(metrics: LayoutMetrics) -> Self {
        Self {
            metrics: Mutex::new(metrics),
            ..Self::default()
        }
    }

    pub fn select(&self, grid: usize, ranges: Vec<SelectionRange>) {
        self.selections
            .lock()
            .expect("selections lock")
            .insert(grid, ranges);
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().expect("surface lock").clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("surface lock").clear();
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().expect("surface lock").push(call);
    }
}

impl GridSurface for FakeSurface {
    fn selected_ranges(&self, grid: usize) -> Vec<SelectionRange> {
        self.selections
            .lock()
            .expect("selections lock")
            .get(&grid)
            .cloned()
            .unwrap_or_default()
    }

    fn set_active(&self, grid: usize) {
        self.record(SurfaceCall::SetActive(grid));
    }

    fn set_active_cell(&self, grid: usize, row: usize, cell: usize) {
        self.record(SurfaceCall::SetActiveCell { grid, row, cell });
    }

    fn set_select_all(&self, grid: usize, selected: bool) {
        self.record(SurfaceCall::SelectAll { grid, selected });
    }

    fn notify_resized(&self, grid: usize) {
        self.record(SurfaceCall::Resized(grid));
    }

    fn scroll_results_to(&self, scroll_top: f64) {
        self.record(SurfaceCall::ScrollResultsTo(scroll_top));
    }

    fn scroll_messages_to_bottom(&self) {
        self.record(SurfaceCall::ScrollMessagesToBottom);
    }

    fn set_messages_selectable(&self, selectable: bool) {
        self.record(SurfaceCall::MessagesSelectable(selectable));
    }

    fn set_results_height(&self, height: f64) {
        self.record(SurfaceCall::ResultsHeight(height));
    }

    fn set_messages_min_height(&self, height: f64) {
        self.record(SurfaceCall::MessagesMinHeight(height));
    }

    fn metrics(&self) -> LayoutMetrics {
        *self.metrics.lock().expect("metrics lock")
    }
}

/// Text selection over a flat document whose message log spans `messages`.
pub struct FakeTextSelection {
    document: String,
    messages: TextRange,
    selection: Mutex<Vec<TextRange>>,
    clears: Mutex<usize>,
}

impl FakeTextSelection {
    pub fn new(document: impl Into<String>, messages: TextRange) -> Self {
        Self {
            document: document.into(),
            messages,
            selection: Mutex::new(Vec::new()),
            clears: Mutex::new(0),
        }
    }

    pub fn select(&self, range: TextRange) {
        *self.selection.lock().expect("selection lock") = vec![range];
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().expect("clears lock")
    }
}

impl Default for FakeTextSelection {
    fn default() -> Self {
        // "results|" then the message log.
        Self::new("results|Query executed|(3 rows affected)", TextRange::new(8, 40))
    }
}

impl TextSelectionProvider for FakeTextSelection {
    fn get_selection(&self) -> Vec<TextRange> {
        self.selection.lock().expect("selection lock").clone()
    }

    fn create_range(&self, region: TextRegion) -> Option<TextRange> {
        match region {
            TextRegion::Messages => Some(self.messages),
        }
    }

    fn clear_selection(&self) {
        self.selection.lock().expect("selection lock").clear();
        *self.clears.lock().expect("clears lock") += 1;
    }

    fn text(&self, range: &TextRange) -> String {
        self.document
            .get(range.start..range.end)
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    copied: Mutex<Vec<String>>,
}

impl FakeClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().expect("clipboard lock").clone()
    }
}

impl Clipboard for FakeClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        self.copied.lock().expect("clipboard lock").push(text.to_string());
        Ok(())
    }
}

pub struct Fixture {
    pub data: Arc<FakeDataService>,
    pub surface: Arc<FakeSurface>,
    pub text: Arc<FakeTextSelection>,
    pub clipboard: Arc<FakeClipboard>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_metrics(LayoutMetrics {
            grid_height: 300.0,
            results_height: 600.0,
            scrollable_height: 622.0,
            window_height: 900.0,
            messages_height: 200.0,
        })
    }

    pub fn with_metrics(metrics: LayoutMetrics) -> Self {
        Self {
            data: FakeDataService::shared(),
            surface: Arc::new(FakeSurface::with_metrics(metrics)),
            text: Arc::new(FakeTextSelection::default()),
            clipboard: Arc::new(FakeClipboard::default()),
        }
    }

    pub fn services(&self) -> ViewerServices {
        ViewerServices {
            data: self.data.clone(),
            shortcuts: Arc::new(KeymapShortcuts::new(&ViewerConfig::default().shortcuts)),
            surface: self.surface.clone(),
            text: self.text.clone(),
            clipboard: self.clipboard.clone(),
        }
    }

    pub fn view(&self) -> ResultsView {
        ResultsView::new(self.services())
    }

    /// View holding one result set per entry of `row_counts`, after a
    /// windowing pass has mounted them.
    pub fn loaded_view(&self, row_counts: &[u64]) -> ResultsView {
        let mut view = self.view();
        view.handle_event(DataEvent::Start("untitled:query-1".into()));
        for (id, rows) in row_counts.iter().enumerate() {
            view.handle_event(result_set(id as i64, *rows));
        }
        view.run_windowing_pass(0.0);
        self.surface.clear_calls();
        view
    }
}

pub fn result_set(id: i64, row_count: u64) -> DataEvent {
    DataEvent::ResultSet(ResultSetSummary {
        batch_id: BatchId(0),
        id: ResultId(id),
        row_count,
        column_info: vec![
            DbColumn::plain("id"),
            DbColumn {
                column_name: "plan".into(),
                is_xml: true,
                is_json: false,
            },
        ],
    })
}

pub fn key(code: &str, ctrl: bool, alt: bool) -> KeyInput {
    KeyInput {
        key: code
            .strip_prefix("Key")
            .unwrap_or(code)
            .to_ascii_lowercase(),
        code: code.to_string(),
        ctrl,
        alt,
        ..KeyInput::default()
    }
}
