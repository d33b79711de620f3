use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use shared::{
    domain::{BatchId, ResultId, SaveFormat, SelectionData, SelectionRange},
    protocol::{DataEnvelope, DataEvent, MessageRecord, ResultSetSummary},
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod layout;
pub mod menus;
pub mod runtime;
pub mod selection;
pub mod services;
pub mod shortcuts;
pub mod windowing;

use config::ViewerConfig;
use dataset::{GridDataSet, PlaceholderDataSet, RenderHeight};
use error::ViewerError;
use format::cell_value_string;
use layout::{results_pane_height, scroll_to_reveal_grid, Pane, PaneLayout};
use menus::{
    grid_icons, ContextAction, ContextClick, ContextMenuRequest, GridIcon, GridIconKind,
    MessagesContextAction, MessagesContextMenuRequest, MSG_CANNOT_SAVE_MULTIPLE_SELECTIONS,
};
use selection::try_combine_selections;
use services::{
    Clipboard, DataService, GridSurface, TextRange, TextRegion, TextSelectionProvider,
};
use shortcuts::{KeyInput, KeyTarget, ShortcutAction, ShortcutResolver};
use windowing::{apply_window, plan_window, ScrollDebounce, WindowPlan};

pub use runtime::{UiInput, ViewerRuntime};

#[derive(Clone)]
pub struct ViewerServices {
    pub data: Arc<dyn DataService>,
    pub shortcuts: Arc<dyn ShortcutResolver>,
    pub surface: Arc<dyn GridSurface>,
    pub text: Arc<dyn TextSelectionProvider>,
    pub clipboard: Arc<dyn Clipboard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedSet {
    All,
    Magnified(usize),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSnapshot {
    pub batch_id: BatchId,
    pub result_id: ResultId,
    pub total_rows: u64,
    pub columns: Vec<String>,
    pub min_height: RenderHeight,
    pub max_height: RenderHeight,
    pub attached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub uri: Option<String>,
    pub started_at: String,
    pub complete: bool,
    pub has_run_query: bool,
    pub total_elapsed_ms: Option<u64>,
    pub active_grid: usize,
    pub magnified: Option<usize>,
    pub scroll_enabled: bool,
    pub windowing_passes: u64,
    pub results_font_size: Option<u32>,
    pub message_shortcut: Option<String>,
    pub result_shortcut: Option<String>,
    pub layout: PaneLayout,
    pub datasets: Vec<DatasetSnapshot>,
    pub messages: Vec<MessageRecord>,
}

/// View state for one results panel.
pub struct ResultsView {
    services: ViewerServices,
    data_sets: Vec<GridDataSet>,
    placeholders: Vec<PlaceholderDataSet>,
    rendered: RenderedSet,
    messages: Vec<MessageRecord>,
    messages_added: bool,
    layout: PaneLayout,
    scroll_enabled: bool,
    first_render: bool,
    results_scroll_top: f64,
    active_grid: usize,
    message_shortcut: Option<String>,
    result_shortcut: Option<String>,
    total_elapsed_ms: Option<u64>,
    complete: bool,
    uri: Option<String>,
    has_run_query: bool,
    results_font_size: Option<u32>,
    started_at: String,
    debounce: ScrollDebounce,
    windowing_passes: u64,
}

impl ResultsView {
    pub fn new(services: ViewerServices) -> Self {
        Self {
            services,
            data_sets: Vec::new(),
            placeholders: Vec::new(),
            rendered: RenderedSet::All,
            messages: Vec::new(),
            messages_added: false,
            layout: PaneLayout::default(),
            scroll_enabled: true,
            first_render: true,
            results_scroll_top: 0.0,
            active_grid: 0,
            message_shortcut: None,
            result_shortcut: None,
            total_elapsed_ms: None,
            complete: false,
            uri: None,
            has_run_query: false,
            results_font_size: None,
            started_at: chrono::Local::now().format("%X").to_string(),
            debounce: ScrollDebounce::default(),
            windowing_passes: 0,
        }
    }

    pub fn services(&self) -> &ViewerServices {
        &self.services
    }

    pub fn data_sets(&self) -> &[GridDataSet] {
        &self.data_sets
    }

    pub fn placeholders(&self) -> &[PlaceholderDataSet] {
        &self.placeholders
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn layout(&self) -> &PaneLayout {
        &self.layout
    }

    pub fn active_grid(&self) -> usize {
        self.active_grid
    }

    pub fn rendered(&self) -> RenderedSet {
        self.rendered
    }

    pub fn is_magnified(&self) -> bool {
        matches!(self.rendered, RenderedSet::Magnified(_))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn has_run_query(&self) -> bool {
        self.has_run_query
    }

    pub fn scroll_enabled(&self) -> bool {
        self.scroll_enabled
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn total_elapsed_ms(&self) -> Option<u64> {
        self.total_elapsed_ms
    }

    pub fn results_font_size(&self) -> Option<u32> {
        self.results_font_size
    }

    pub fn message_shortcut(&self) -> Option<&str> {
        self.message_shortcut.as_deref()
    }

    pub fn result_shortcut(&self) -> Option<&str> {
        self.result_shortcut.as_deref()
    }

    pub fn windowing_passes(&self) -> u64 {
        self.windowing_passes
    }

    pub fn messages_pending_scroll(&self) -> bool {
        self.messages_added
    }

    pub fn apply_config(&mut self, config: &ViewerConfig) {
        self.layout.message_active = config.messages_default_open;
        self.results_font_size = Some(config.results_font_size);
    }

    pub fn set_shortcut_labels(&mut self, message: Option<String>, result: Option<String>) {
        self.message_shortcut = message;
        self.result_shortcut = result;
    }

    pub fn handle_envelope(&mut self, envelope: DataEnvelope) {
        match DataEvent::try_from(envelope) {
            Ok(event) => self.handle_event(event),
            Err(err) => error!(kind = err.kind(), "{err}"),
        }
    }

    pub fn handle_event(&mut self, event: DataEvent) {
        match event {
            DataEvent::Start(uri) => {
                debug!(%uri, "query started");
                self.uri = Some(uri);
                if self.has_run_query {
                    self.reset_for_new_run();
                }
            }
            DataEvent::Complete(elapsed_ms) => {
                info!(elapsed_ms, result_sets = self.data_sets.len(), "query complete");
                self.total_elapsed_ms = Some(elapsed_ms);
                self.complete = true;
                self.messages_added = true;
                self.has_run_query = true;
                self.layout.result_active = true;
                self.set_message_active(true);
            }
            DataEvent::Message(message) => {
                self.messages.push(message);
                self.messages_added = true;
            }
            DataEvent::ResultSet(summary) => self.add_result_set(&summary),
        }
    }

    fn reset_for_new_run(&mut self) {
        self.data_sets.clear();
        self.placeholders.clear();
        self.rendered = RenderedSet::All;
        self.messages.clear();
        self.complete = false;
        self.messages_added = false;
        self.has_run_query = false;
        self.active_grid = 0;
        self.first_render = true;
        self.debounce.cancel();
    }

    fn add_result_set(&mut self, summary: &ResultSetSummary) {
        debug!(
            batch_id = summary.batch_id.0,
            result_id = summary.id.0,
            row_count = summary.row_count,
            "result set received"
        );
        let dataset = GridDataSet::from_summary(summary, Arc::clone(&self.services.data));
        self.placeholders.push(PlaceholderDataSet::detached(&dataset));
        self.data_sets.push(dataset);
        self.messages_added = true;
        self.on_scroll(0.0);
    }

    /// Post-paint hook: keeps the message log pinned to its newest entry.
    pub fn after_view_checked(&mut self) {
        if self.messages_added {
            self.messages_added = false;
            self.services.surface.scroll_messages_to_bottom();
        }
    }

    pub fn on_scroll(&mut self, scroll_top: f64) {
        self.results_scroll_top = scroll_top;
        self.debounce.arm(Instant::now(), scroll_top);
    }

    pub fn windowing_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn windowing_pending(&self) -> bool {
        self.debounce.is_armed()
    }

    /// Runs the debounced windowing pass if its deadline has passed.
    pub fn fire_due_windowing(&mut self) -> bool {
        match self.debounce.take_due(Instant::now()) {
            Some(scroll_top) => {
                self.run_windowing_pass(scroll_top);
                true
            }
            None => false,
        }
    }

    pub fn run_windowing_pass(&mut self, scroll_top: f64) {
        self.debounce.cancel();
        let metrics = self.services.surface.metrics();
        let plan = plan_window(self.data_sets.len(), scroll_top, &metrics);
        self.scroll_enabled = plan.scroll_enabled();
        let mounted = apply_window(&plan, &self.data_sets, &mut self.placeholders);
        self.windowing_passes += 1;
        if let WindowPlan::Visible(range) = &plan {
            debug!(min = range.start, max = range.end, "windowing pass");
        }

        for index in mounted {
            if let Some(grid) = self.rendered_position(index) {
                self.services.surface.notify_resized(grid);
            }
        }

        if self.first_render && self.rendered_len() > 0 {
            self.first_render = false;
            self.services.surface.set_active(0);
        }
    }

    pub fn rendered_len(&self) -> usize {
        match self.rendered {
            RenderedSet::All => self.placeholders.len(),
            RenderedSet::Magnified(_) => 1,
        }
    }

    pub fn rendered_data_sets(&self) -> Vec<&PlaceholderDataSet> {
        match self.rendered {
            RenderedSet::All => self.placeholders.iter().collect(),
            RenderedSet::Magnified(index) => self.placeholders.get(index).into_iter().collect(),
        }
    }

    pub fn rendered_data_set(&self, grid: usize) -> Option<&PlaceholderDataSet> {
        match self.rendered {
            RenderedSet::All => self.placeholders.get(grid),
            RenderedSet::Magnified(index) if grid == 0 => self.placeholders.get(index),
            RenderedSet::Magnified(_) => None,
        }
    }

    fn rendered_position(&self, placeholder_index: usize) -> Option<usize> {
        match self.rendered {
            RenderedSet::All => Some(placeholder_index),
            RenderedSet::Magnified(index) => (index == placeholder_index).then_some(0),
        }
    }

    fn grid(&self, grid: usize) -> Result<&PlaceholderDataSet, ViewerError> {
        self.rendered_data_set(grid)
            .ok_or(ViewerError::NoSuchGrid {
                index: grid,
                rendered: self.rendered_len(),
            })
    }

    /// Toggles between one grid filling the pane and every grid rendered.
    pub fn magnify(&mut self, grid: usize) {
        if self.rendered_len() > 1 {
            let Some(index) = (grid < self.placeholders.len()).then_some(grid) else {
                warn!(grid, "ignoring magnify of unknown grid");
                return;
            };
            self.rendered = RenderedSet::Magnified(index);
        } else {
            self.rendered = RenderedSet::All;
            self.on_scroll(0.0);
        }
        self.active_grid = 0;
        self.resize_grids();
        if self.rendered_len() > 0 {
            self.services.surface.set_active(0);
        }
    }

    pub fn navigate_to_grid(&mut self, target: usize) -> bool {
        if target >= self.rendered_len() {
            return false;
        }

        self.services.text.clear_selection();

        if self.active_grid == target {
            return false;
        }

        let surface = &self.services.surface;
        surface.set_select_all(self.active_grid, false);
        surface.set_active(target);
        self.active_grid = target;

        let metrics = surface.metrics();
        if let Some(scroll_top) = scroll_to_reveal_grid(
            self.results_scroll_top,
            metrics.results_height,
            metrics.grid_height,
            target,
        ) {
            self.results_scroll_top = scroll_top;
            surface.scroll_results_to(scroll_top);
        }
        true
    }

    pub fn grid_icons(&self) -> Vec<GridIcon> {
        grid_icons(self.data_sets.len(), self.is_magnified())
    }

    pub fn set_message_active(&mut self, active: bool) {
        self.layout.message_active = active;
        if self.layout.result_active {
            self.resize_grids();
        }
    }

    pub fn toggle_messages_pane(&mut self) {
        self.set_message_active(!self.layout.message_active);
        if self.layout.message_active {
            self.resize_results();
        }
    }

    pub fn toggle_results_pane(&mut self) {
        self.flip_results_active();
        self.resize_results();
    }

    pub fn flip_results_active(&mut self) {
        self.layout.result_active = !self.layout.result_active;
    }

    /// Enter or Space on a pane header toggles that pane; returns whether the
    /// key was consumed.
    pub fn handle_pane_keydown(&mut self, pane: Pane, key: &KeyInput) -> bool {
        if !key.is_enter_or_space() {
            return false;
        }
        match pane {
            Pane::Messages => self.toggle_messages_pane(),
            Pane::Results => self.toggle_results_pane(),
        }
        true
    }

    pub fn resize_results(&mut self) {
        let metrics = self.services.surface.metrics();
        self.services
            .surface
            .set_results_height(results_pane_height(&metrics));
        self.resize_grids();
    }

    pub fn resize_grids(&self) {
        for grid in 0..self.rendered_len() {
            self.services.surface.notify_resized(grid);
        }
    }

    pub fn begin_resize(&mut self, page_y: f64) {
        let metrics = self.services.surface.metrics();
        self.layout.begin_resize(page_y, metrics.messages_height);
    }

    pub fn track_resize(&mut self, page_y: f64) {
        self.layout.track_resize(page_y);
    }

    pub fn end_resize(&mut self, page_y: f64) {
        let metrics = self.services.surface.metrics();
        let min_height = self.layout.end_resize(page_y, metrics.window_height);
        self.services.surface.set_messages_min_height(min_height);
        self.resize_results();
    }

    pub fn on_messages_mouse_down(&mut self) {
        if self.rendered_len() > 0 {
            self.services
                .surface
                .set_select_all(self.active_grid, false);
        }
        self.services.text.clear_selection();
        self.services.surface.set_messages_selectable(true);
    }

    pub fn selected_range_under_messages(&self) -> Option<TextRange> {
        let region = self.services.text.create_range(TextRegion::Messages)?;
        let selection = self.services.text.get_selection();
        selection.first()?.intersection(&region)
    }

    pub fn execute_copy(&self, text: &str) -> Result<()> {
        self.services.clipboard.copy_text(text)
    }

    pub fn merged_selection(&self, grid: usize) -> Vec<SelectionRange> {
        try_combine_selections(&self.services.surface.selected_ranges(grid))
    }

    pub fn focus_results_grid(&mut self) {
        if self.rendered_len() > 0 {
            self.services
                .surface
                .set_active_cell(self.active_grid, 0, 1);
        }
    }

    pub fn select_all_active(&mut self) {
        if self.rendered_len() > 0 {
            self.services.surface.set_select_all(self.active_grid, true);
        }
    }

    /// Copies selected message text, or the active grid's selection when no
    /// message text is selected.
    pub async fn copy_selection(&mut self) -> Result<()> {
        let message_text = self
            .selected_range_under_messages()
            .map(|range| self.services.text.text(&range))
            .unwrap_or_default();
        if !message_text.is_empty() {
            return self.execute_copy(&message_text);
        }
        self.copy_active(false).await
    }

    pub async fn copy_active_with_headers(&mut self) -> Result<()> {
        self.copy_active(true).await
    }

    async fn copy_active(&self, include_headers: bool) -> Result<()> {
        let Ok(grid) = self.grid(self.active_grid) else {
            debug!("copy requested with no rendered grid");
            return Ok(());
        };
        let selection = self.merged_selection(self.active_grid);
        self.services
            .data
            .copy_results(Some(selection), grid.batch_id, grid.result_id, include_headers)
            .await
    }

    pub async fn save_active(&mut self, format: SaveFormat) -> Result<()> {
        if self.rendered_len() == 0 {
            debug!(%format, "save requested with no rendered grid");
            return Ok(());
        }
        self.save_grid(self.active_grid, format).await
    }

    /// Sends a save request for `grid`; a selection that does not merge into
    /// one range is refused with a warning.
    pub async fn save_grid(&self, grid: usize, format: SaveFormat) -> Result<()> {
        let dataset = self.grid(grid)?;
        let selection = self.merged_selection(grid);
        self.send_save(dataset.batch_id, dataset.result_id, format, selection)
            .await
    }

    async fn send_save(
        &self,
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    ) -> Result<()> {
        if selection.len() > 1 {
            info!(%format, ranges = selection.len(), "refusing save of multiple selections");
            return self
                .services
                .data
                .show_warning(MSG_CANNOT_SAVE_MULTIPLE_SELECTIONS)
                .await;
        }
        self.services
            .data
            .send_save_request(batch_id, result_id, format, selection)
            .await
    }

    pub async fn handle_icon_click(&mut self, icon: GridIconKind, grid: usize) -> Result<()> {
        match icon.save_format() {
            Some(format) => self.save_grid(grid, format).await,
            None => {
                self.magnify(grid);
                Ok(())
            }
        }
    }

    pub fn open_context_menu(
        &self,
        grid: usize,
        x: f64,
        y: f64,
    ) -> Result<ContextMenuRequest, ViewerError> {
        let dataset = self.grid(grid)?;
        Ok(ContextMenuRequest {
            x,
            y,
            batch_id: dataset.batch_id,
            result_id: dataset.result_id,
            index: grid,
            selection: self.merged_selection(grid),
        })
    }

    pub async fn handle_context_click(&mut self, click: ContextClick) -> Result<()> {
        let ContextClick {
            action,
            batch_id,
            result_id,
            index,
            selection,
        } = click;
        let data = Arc::clone(&self.services.data);
        match action {
            ContextAction::SaveCsv => {
                self.send_save(batch_id, result_id, SaveFormat::Csv, selection)
                    .await
            }
            ContextAction::SaveJson => {
                self.send_save(batch_id, result_id, SaveFormat::Json, selection)
                    .await
            }
            ContextAction::SaveExcel => {
                self.send_save(batch_id, result_id, SaveFormat::Excel, selection)
                    .await
            }
            ContextAction::SelectAll => {
                if index < self.rendered_len() {
                    self.active_grid = index;
                }
                self.select_all_active();
                Ok(())
            }
            ContextAction::CopySelection => {
                data.copy_results(Some(selection), batch_id, result_id, false)
                    .await
            }
            ContextAction::CopyWithHeaders => {
                data.copy_results(Some(selection), batch_id, result_id, true)
                    .await
            }
            ContextAction::CopyAllHeaders => {
                data.copy_results(None, batch_id, result_id, true).await
            }
        }
    }

    pub fn open_messages_context_menu(&self, x: f64, y: f64) -> MessagesContextMenuRequest {
        MessagesContextMenuRequest {
            x,
            y,
            selected_range: self.selected_range_under_messages(),
        }
    }

    pub fn handle_messages_context_click(
        &self,
        action: MessagesContextAction,
        selected_range: Option<TextRange>,
    ) -> Result<()> {
        match action {
            MessagesContextAction::CopySelection => {
                let Some(range) = selected_range else {
                    return Ok(());
                };
                let text = self.services.text.text(&range);
                self.execute_copy(&text)
            }
        }
    }

    /// Opens the XML/JSON value at `(row, column)` of rendered grid `grid`.
    pub async fn open_link_at(&self, grid: usize, row: u64, column: usize) -> Result<()> {
        let dataset = self.grid(grid)?;
        let definition = dataset
            .columns
            .get(column)
            .ok_or(ViewerError::NoSuchColumn { grid, column })?;
        let link_type = definition
            .link_type
            .ok_or(ViewerError::NotALinkColumn { grid, column })?;
        if row >= dataset.total_rows {
            return Err(ViewerError::NoSuchRow {
                grid,
                row,
                total: dataset.total_rows,
            }
            .into());
        }
        let rows = dataset
            .row_source()
            .ok_or(ViewerError::RowsNotMounted { grid })?;
        let values = rows
            .rows(row, row + 1)
            .await?
            .into_iter()
            .next()
            .map(|fetched| fetched.values)
            .unwrap_or_default();
        let value = cell_value_string(&values, column);
        self.services
            .data
            .open_link(&value, &definition.name, link_type)
            .await
    }

    pub async fn send_get_request(&self, selection: SelectionData) -> Result<()> {
        self.services.data.set_editor_selection(selection).await
    }

    /// First half of key handling: adjusts message selectability and returns
    /// the shortcut signature to resolve.
    pub fn begin_key_event(&self, input: &KeyInput) -> String {
        let is_grid = input.target == KeyTarget::GridCell;
        self.services.surface.set_messages_selectable(!is_grid);
        self.services.shortcuts.build_event_string(input)
    }

    /// Second half of key handling, once the signature has been resolved.
    /// Returns the action when the key was consumed.
    pub async fn finish_key_event(
        &mut self,
        event_name: Option<&str>,
        target: KeyTarget,
    ) -> Result<Option<ShortcutAction>> {
        let Some(name) = event_name else {
            return Ok(None);
        };
        let Some(action) = ShortcutAction::from_event_name(name) else {
            warn!(event = name, "no handler for shortcut event");
            return Ok(None);
        };

        let is_grid = target == KeyTarget::GridCell;
        if !(action == ShortcutAction::SelectAll && !is_grid) {
            shortcuts::dispatch(self, action).await?;
        }
        if action == ShortcutAction::SelectAll {
            self.services.text.clear_selection();
        }
        Ok(Some(action))
    }

    pub async fn key_event(&mut self, input: &KeyInput) -> Result<Option<ShortcutAction>> {
        let signature = self.begin_key_event(input);
        let resolved = self.services.shortcuts.get_event(&signature).await?;
        self.finish_key_event(resolved.as_deref(), input.target)
            .await
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            uri: self.uri.clone(),
            started_at: self.started_at.clone(),
            complete: self.complete,
            has_run_query: self.has_run_query,
            total_elapsed_ms: self.total_elapsed_ms,
            active_grid: self.active_grid,
            magnified: match self.rendered {
                RenderedSet::All => None,
                RenderedSet::Magnified(index) => Some(index),
            },
            scroll_enabled: self.scroll_enabled,
            windowing_passes: self.windowing_passes,
            results_font_size: self.results_font_size,
            message_shortcut: self.message_shortcut.clone(),
            result_shortcut: self.result_shortcut.clone(),
            layout: self.layout.clone(),
            datasets: self
                .placeholders
                .iter()
                .map(|p| DatasetSnapshot {
                    batch_id: p.batch_id,
                    result_id: p.result_id,
                    total_rows: p.total_rows,
                    columns: p.columns.iter().map(|c| c.name.clone()).collect(),
                    min_height: p.min_height,
                    max_height: p.max_height,
                    attached: p.is_attached(),
                })
                .collect(),
            messages: self.messages.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
