//! Results/messages pane state and the boundary drag handle.

use serde::{Deserialize, Serialize};

pub const RESULTS_PANE_BOUNDARY: f64 = 22.0;

/// Measurements reported by the host surface, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub grid_height: f64,
    pub results_height: f64,
    pub scrollable_height: f64,
    pub window_height: f64,
    pub messages_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Results,
    Messages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneLayout {
    pub result_active: bool,
    pub message_active: bool,
    pub resizing: bool,
    pub resize_handle_top: f64,
    pub messages_pane_height: f64,
    pub messages_min_height: Option<f64>,
}

impl Default for PaneLayout {
    fn default() -> Self {
        Self {
            result_active: true,
            message_active: true,
            resizing: false,
            resize_handle_top: 0.0,
            messages_pane_height: 0.0,
            messages_min_height: None,
        }
    }
}

impl PaneLayout {
    pub fn begin_resize(&mut self, page_y: f64, messages_height: f64) {
        self.resizing = true;
        self.resize_handle_top = page_y;
        self.messages_pane_height = messages_height;
    }

    pub fn track_resize(&mut self, page_y: f64) {
        self.resize_handle_top = page_y;
    }

    /// Fixes the messages pane minimum height from the final pointer position.
    pub fn end_resize(&mut self, page_y: f64, window_height: f64) -> f64 {
        self.resizing = false;
        self.resize_handle_top = page_y;
        let min_height = window_height - (page_y + RESULTS_PANE_BOUNDARY);
        self.messages_min_height = Some(min_height);
        min_height
    }
}

pub fn results_pane_height(metrics: &LayoutMetrics) -> f64 {
    metrics.scrollable_height - RESULTS_PANE_BOUNDARY
}

/// Scroll offset that brings grid `target` fully into view, if the current
/// offset does not already.
pub fn scroll_to_reveal_grid(
    scroll_top: f64,
    viewport_height: f64,
    grid_height: f64,
    target: usize,
) -> Option<f64> {
    let mut next = scroll_top;
    let scroll_bottom = scroll_top + viewport_height;
    let grid_bottom = grid_height * (target as f64 + 1.0);
    if scroll_bottom < grid_bottom {
        next += grid_bottom - scroll_bottom;
    }
    let grid_top = grid_height * target as f64;
    if next > grid_top {
        next = grid_top;
    }
    (next != scroll_top).then_some(next)
}
