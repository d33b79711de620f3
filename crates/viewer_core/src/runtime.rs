//! Event loop that owns a [`ResultsView`] and feeds it data events, host input
//! and the results of spawned lookups.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::{domain::SelectionData, protocol::DataEnvelope};
use tokio::{
    sync::mpsc,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    config::ViewerConfig,
    layout::Pane,
    menus::{ContextClick, GridIconKind, MessagesContextAction},
    shortcuts::{KeyInput, KeyTarget, ShortcutAction},
    ResultsView,
};

/// Host input forwarded to the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiInput {
    Scroll { scroll_top: f64 },
    Key(KeyInput),
    MessagesMouseDown,
    Magnify { index: usize },
    NavigateToGrid { index: usize },
    TogglePane { pane: Pane },
    PaneHeaderKey { pane: Pane, key: KeyInput },
    ContextMenu { index: usize, x: f64, y: f64 },
    ContextClick { click: ContextClick },
    MessagesContextCopy,
    IconClick { icon: GridIconKind, index: usize },
    LinkClick { grid: usize, row: u64, column: usize },
    MessageLinkClick { selection: SelectionData },
    ResizeStart { page_y: f64 },
    ResizeMove { page_y: f64 },
    ResizeEnd { page_y: f64 },
    WindowResized,
}

enum Internal {
    Config(Result<ViewerConfig>),
    ShortcutLabels {
        message: Result<Option<String>>,
        result: Result<Option<String>>,
    },
    Shortcut {
        target: KeyTarget,
        resolved: Result<Option<String>>,
    },
}

pub struct ViewerRuntime {
    view: ResultsView,
    uri: String,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    inflight: usize,
}

impl ViewerRuntime {
    pub fn new(view: ResultsView, uri: impl Into<String>) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            view,
            uri: uri.into(),
            internal_tx,
            internal_rx,
            inflight: 0,
        }
    }

    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    /// Runs until both input channels are closed, every spawned lookup has
    /// reported back and no windowing pass is pending. Returns the final view.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<DataEnvelope>,
        mut inputs: mpsc::Receiver<UiInput>,
    ) -> ResultsView {
        let data = Arc::clone(&self.view.services().data);
        if let Err(err) = data.send_ready_event(&self.uri).await {
            warn!(uri = %self.uri, error = %format!("{err:#}"), "failed to send ready event");
        }
        self.spawn_startup();

        let mut events_open = true;
        let mut inputs_open = true;
        loop {
            if !events_open
                && !inputs_open
                && self.inflight == 0
                && !self.view.windowing_pending()
            {
                break;
            }

            let deadline = self.view.windowing_deadline();
            // Data events drain ahead of host input queued behind them.
            tokio::select! {
                biased;
                envelope = events.recv(), if events_open => match envelope {
                    Some(envelope) => self.view.handle_envelope(envelope),
                    None => events_open = false,
                },
                input = inputs.recv(), if inputs_open => match input {
                    Some(input) => {
                        if let Err(err) = self.handle_input(input).await {
                            warn!(error = %format!("{err:#}"), "input handling failed");
                        }
                    }
                    None => inputs_open = false,
                },
                Some(internal) = self.internal_rx.recv(), if self.inflight > 0 => {
                    self.inflight -= 1;
                    if let Err(err) = self.handle_internal(internal).await {
                        warn!(error = %format!("{err:#}"), "deferred handling failed");
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.view.fire_due_windowing();
                }
            }

            self.view.after_view_checked();
        }

        info!(uri = %self.uri, "viewer runtime stopped");
        self.view
    }

    fn spawn_startup(&mut self) {
        let data = Arc::clone(&self.view.services().data);
        let tx = self.internal_tx.clone();
        self.inflight += 1;
        tokio::spawn(async move {
            let _ = tx.send(Internal::Config(data.config().await));
        });

        let shortcuts = Arc::clone(&self.view.services().shortcuts);
        let tx = self.internal_tx.clone();
        self.inflight += 1;
        tokio::spawn(async move {
            let (message, result) = futures::future::join(
                shortcuts.string_code_for(ShortcutAction::ToggleMessagePane.event_name()),
                shortcuts.string_code_for(ShortcutAction::ToggleResultPane.event_name()),
            )
            .await;
            let _ = tx.send(Internal::ShortcutLabels { message, result });
        });
    }

    fn spawn_shortcut_lookup(&mut self, input: &KeyInput) {
        let signature = self.view.begin_key_event(input);
        let shortcuts = Arc::clone(&self.view.services().shortcuts);
        let tx = self.internal_tx.clone();
        let target = input.target;
        self.inflight += 1;
        tokio::spawn(async move {
            let resolved = shortcuts.get_event(&signature).await;
            let _ = tx.send(Internal::Shortcut { target, resolved });
        });
    }

    async fn handle_internal(&mut self, internal: Internal) -> Result<()> {
        match internal {
            Internal::Config(config) => {
                let config = config?;
                debug!(
                    messages_default_open = config.messages_default_open,
                    results_font_size = config.results_font_size,
                    "config loaded"
                );
                self.view.apply_config(&config);
            }
            Internal::ShortcutLabels { message, result } => {
                let message = message.unwrap_or_else(|err| {
                    warn!(error = %format!("{err:#}"), "no label for messages pane shortcut");
                    None
                });
                let result = result.unwrap_or_else(|err| {
                    warn!(error = %format!("{err:#}"), "no label for results pane shortcut");
                    None
                });
                self.view.set_shortcut_labels(message, result);
            }
            Internal::Shortcut { target, resolved } => {
                let resolved = resolved?;
                if let Some(action) = self
                    .view
                    .finish_key_event(resolved.as_deref(), target)
                    .await?
                {
                    debug!(event = action.event_name(), "shortcut handled");
                }
            }
        }
        Ok(())
    }

    async fn handle_input(&mut self, input: UiInput) -> Result<()> {
        if let UiInput::Key(key) = &input {
            self.spawn_shortcut_lookup(key);
            return Ok(());
        }

        let view = &mut self.view;
        match input {
            UiInput::Key(_) => {}
            UiInput::Scroll { scroll_top } => view.on_scroll(scroll_top),
            UiInput::MessagesMouseDown => view.on_messages_mouse_down(),
            UiInput::Magnify { index } => view.magnify(index),
            UiInput::NavigateToGrid { index } => {
                view.navigate_to_grid(index);
            }
            UiInput::TogglePane { pane: Pane::Messages } => view.toggle_messages_pane(),
            UiInput::TogglePane { pane: Pane::Results } => view.toggle_results_pane(),
            UiInput::PaneHeaderKey { pane, key } => {
                view.handle_pane_keydown(pane, &key);
            }
            UiInput::ContextMenu { index, x, y } => {
                let request = view.open_context_menu(index, x, y)?;
                debug!(
                    batch_id = request.batch_id.0,
                    result_id = request.result_id.0,
                    ranges = request.selection.len(),
                    "grid context menu opened"
                );
            }
            UiInput::ContextClick { click } => view.handle_context_click(click).await?,
            UiInput::MessagesContextCopy => {
                let range = view.selected_range_under_messages();
                view.handle_messages_context_click(MessagesContextAction::CopySelection, range)?;
            }
            UiInput::IconClick { icon, index } => view.handle_icon_click(icon, index).await?,
            UiInput::LinkClick { grid, row, column } => {
                view.open_link_at(grid, row, column).await?
            }
            UiInput::MessageLinkClick { selection } => view.send_get_request(selection).await?,
            UiInput::ResizeStart { page_y } => view.begin_resize(page_y),
            UiInput::ResizeMove { page_y } => view.track_resize(page_y),
            UiInput::ResizeEnd { page_y } => view.end_resize(page_y),
            UiInput::WindowResized => view.resize_results(),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
