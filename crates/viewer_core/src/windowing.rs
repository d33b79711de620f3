//! Scroll-driven attach/detach of placeholder row sources.

use std::{ops::Range, time::Duration};

use tokio::time::Instant;

use crate::{
    dataset::{GridDataSet, PlaceholderDataSet},
    layout::LayoutMetrics,
};

pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(200);
pub const MAX_SCROLL_GRIDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowPlan {
    MountAll,
    Visible(Range<usize>),
}

impl WindowPlan {
    pub fn scroll_enabled(&self) -> bool {
        matches!(self, WindowPlan::Visible(_))
    }
}

pub fn plan_window(dataset_count: usize, scroll_top: f64, metrics: &LayoutMetrics) -> WindowPlan {
    if dataset_count < MAX_SCROLL_GRIDS || metrics.grid_height <= 0.0 {
        return WindowPlan::MountAll;
    }
    WindowPlan::Visible(visible_grid_range(
        scroll_top.max(0.0),
        metrics.grid_height,
        metrics.results_height,
    ))
}

pub fn visible_grid_range(scroll_top: f64, grid_height: f64, viewport_height: f64) -> Range<usize> {
    let partial = (scroll_top % grid_height) / grid_height;
    let visible = (viewport_height / grid_height + partial).ceil() as usize;
    let min = (scroll_top / grid_height).floor() as usize;
    min..min.saturating_add(visible)
}

/// Applies `plan` and returns the indices whose rows were newly mounted.
pub fn apply_window(
    plan: &WindowPlan,
    datasets: &[GridDataSet],
    placeholders: &mut [PlaceholderDataSet],
) -> Vec<usize> {
    let mut mounted = Vec::new();
    for (index, (placeholder, dataset)) in placeholders.iter_mut().zip(datasets).enumerate() {
        match plan {
            WindowPlan::MountAll => {
                placeholder.attach(dataset);
                mounted.push(index);
            }
            WindowPlan::Visible(range) if range.contains(&index) => {
                if placeholder.attach(dataset) {
                    mounted.push(index);
                }
            }
            WindowPlan::Visible(_) => placeholder.detach(),
        }
    }
    mounted
}

/// Single resettable deadline; arming always replaces the pending pass.
#[derive(Debug, Clone, Default)]
pub struct ScrollDebounce {
    pending: Option<(Instant, f64)>,
}

impl ScrollDebounce {
    pub fn arm(&mut self, now: Instant, scroll_top: f64) {
        self.pending = Some((now + SCROLL_DEBOUNCE, scroll_top));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(deadline, _)| deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending offset once its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<f64> {
        match self.pending {
            Some((deadline, scroll_top)) if deadline <= now => {
                self.pending = None;
                Some(scroll_top)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/windowing_tests.rs"]
mod tests;
