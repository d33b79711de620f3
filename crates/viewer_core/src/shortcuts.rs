//! Keyboard shortcut resolution and the action table.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::SaveFormat;

use crate::ResultsView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    FocusResultsGrid,
    ToggleResultPane,
    ToggleMessagePane,
    NextGrid,
    PrevGrid,
    CopySelection,
    CopyWithHeaders,
    MaximizeGrid,
    SelectAll,
    SaveAsCsv,
    SaveAsJson,
    SaveAsExcel,
}

impl ShortcutAction {
    pub const ALL: [ShortcutAction; 12] = [
        ShortcutAction::FocusResultsGrid,
        ShortcutAction::ToggleResultPane,
        ShortcutAction::ToggleMessagePane,
        ShortcutAction::NextGrid,
        ShortcutAction::PrevGrid,
        ShortcutAction::CopySelection,
        ShortcutAction::CopyWithHeaders,
        ShortcutAction::MaximizeGrid,
        ShortcutAction::SelectAll,
        ShortcutAction::SaveAsCsv,
        ShortcutAction::SaveAsJson,
        ShortcutAction::SaveAsExcel,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            ShortcutAction::FocusResultsGrid => "event.focusResultsGrid",
            ShortcutAction::ToggleResultPane => "event.toggleResultPane",
            ShortcutAction::ToggleMessagePane => "event.toggleMessagePane",
            ShortcutAction::NextGrid => "event.nextGrid",
            ShortcutAction::PrevGrid => "event.prevGrid",
            ShortcutAction::CopySelection => "event.copySelection",
            ShortcutAction::CopyWithHeaders => "event.copyWithHeaders",
            ShortcutAction::MaximizeGrid => "event.maximizeGrid",
            ShortcutAction::SelectAll => "event.selectAll",
            ShortcutAction::SaveAsCsv => "event.saveAsCSV",
            ShortcutAction::SaveAsJson => "event.saveAsJSON",
            ShortcutAction::SaveAsExcel => "event.saveAsExcel",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.event_name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTarget {
    GridCell,
    #[default]
    Other,
}

/// A raw keydown as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyInput {
    pub key: String,
    pub code: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    pub target: KeyTarget,
}

impl KeyInput {
    pub fn is_enter_or_space(&self) -> bool {
        matches!(self.code.as_str(), "Enter" | "Space")
            || matches!(self.key.as_str(), "Enter" | " ")
    }
}

#[async_trait]
pub trait ShortcutResolver: Send + Sync {
    async fn string_code_for(&self, event_name: &str) -> Result<Option<String>>;
    fn build_event_string(&self, input: &KeyInput) -> String;
    async fn get_event(&self, signature: &str) -> Result<Option<String>>;
}

/// Shortcut service backed by the configured key table.
#[derive(Debug, Clone, Default)]
pub struct KeymapShortcuts {
    by_signature: HashMap<String, String>,
    by_event: BTreeMap<String, String>,
}

impl KeymapShortcuts {
    pub fn new(bindings: &BTreeMap<String, String>) -> Self {
        let mut by_signature = HashMap::new();
        let mut by_event = BTreeMap::new();
        for (event, keys) in bindings {
            let Some(signature) = normalize_key_string(keys) else {
                continue;
            };
            by_signature.insert(signature.clone(), event.clone());
            by_event.insert(event.clone(), signature);
        }
        Self {
            by_signature,
            by_event,
        }
    }
}

#[async_trait]
impl ShortcutResolver for KeymapShortcuts {
    async fn string_code_for(&self, event_name: &str) -> Result<Option<String>> {
        Ok(self.by_event.get(event_name).map(|sig| display_label(sig)))
    }

    fn build_event_string(&self, input: &KeyInput) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(5);
        if input.ctrl {
            parts.push("ctrl".into());
        }
        if input.alt {
            parts.push("alt".into());
        }
        if input.shift {
            parts.push("shift".into());
        }
        if input.meta {
            parts.push("meta".into());
        }
        parts.push(key_name(input));
        parts.join("+")
    }

    async fn get_event(&self, signature: &str) -> Result<Option<String>> {
        Ok(self.by_signature.get(signature).cloned())
    }
}

fn key_name(input: &KeyInput) -> String {
    let code = input.code.as_str();
    let stripped = ["Key", "Digit", "Arrow"]
        .iter()
        .find_map(|prefix| code.strip_prefix(*prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(code);
    if stripped.is_empty() {
        input.key.to_ascii_lowercase()
    } else {
        stripped.to_ascii_lowercase()
    }
}

/// Canonical `ctrl+alt+shift+meta+key` form of a configured key string.
pub fn normalize_key_string(keys: &str) -> Option<String> {
    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut meta = false;
    let mut key = None;
    for part in keys.split('+').map(|p| p.trim().to_ascii_lowercase()) {
        match part.as_str() {
            "" => {}
            "ctrl" | "control" | "cmd" | "ctrlcmd" => ctrl = true,
            "alt" | "option" => alt = true,
            "shift" => shift = true,
            "meta" | "win" | "super" => meta = true,
            _ => key = Some(part),
        }
    }
    let key = key?;
    let mut parts = Vec::with_capacity(5);
    for (on, name) in [(ctrl, "ctrl"), (alt, "alt"), (shift, "shift"), (meta, "meta")] {
        if on {
            parts.push(name.to_string());
        }
    }
    parts.push(key);
    Some(parts.join("+"))
}

fn display_label(signature: &str) -> String {
    signature
        .split('+')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Runs `action` against the view.
pub async fn dispatch(view: &mut ResultsView, action: ShortcutAction) -> Result<()> {
    match action {
        ShortcutAction::FocusResultsGrid => view.focus_results_grid(),
        ShortcutAction::ToggleResultPane => view.flip_results_active(),
        ShortcutAction::ToggleMessagePane => view.toggle_messages_pane(),
        ShortcutAction::NextGrid => {
            view.navigate_to_grid(view.active_grid() + 1);
        }
        ShortcutAction::PrevGrid => {
            if let Some(target) = view.active_grid().checked_sub(1) {
                view.navigate_to_grid(target);
            }
        }
        ShortcutAction::CopySelection => view.copy_selection().await?,
        ShortcutAction::CopyWithHeaders => view.copy_active_with_headers().await?,
        ShortcutAction::MaximizeGrid => view.magnify(view.active_grid()),
        ShortcutAction::SelectAll => view.select_all_active(),
        ShortcutAction::SaveAsCsv => view.save_active(SaveFormat::Csv).await?,
        ShortcutAction::SaveAsJson => view.save_active(SaveFormat::Json).await?,
        ShortcutAction::SaveAsExcel => view.save_active(SaveFormat::Excel).await?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/shortcuts_tests.rs"]
mod tests;
