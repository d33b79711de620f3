use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "viewer.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub messages_default_open: bool,
    pub results_font_size: u32,
    /// Action name to key string, e.g. `event.nextGrid = "ctrl+down"`.
    pub shortcuts: BTreeMap<String, String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let shortcuts = [
            ("event.focusResultsGrid", "ctrl+alt+g"),
            ("event.toggleResultPane", "ctrl+alt+r"),
            ("event.toggleMessagePane", "ctrl+alt+y"),
            ("event.prevGrid", "ctrl+up"),
            ("event.nextGrid", "ctrl+down"),
            ("event.copySelection", "ctrl+c"),
            ("event.copyWithHeaders", ""),
            ("event.maximizeGrid", ""),
            ("event.selectAll", "ctrl+a"),
            ("event.saveAsJSON", ""),
            ("event.saveAsCSV", ""),
            ("event.saveAsExcel", ""),
        ]
        .into_iter()
        .map(|(name, keys)| (name.to_string(), keys.to_string()))
        .collect();

        Self {
            messages_default_open: true,
            results_font_size: 13,
            shortcuts,
        }
    }
}

/// Loads `viewer.toml` from the working directory, falling back to defaults,
/// then applies environment overrides.
pub fn load_config() -> ViewerConfig {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    let mut config = if path.exists() {
        load_config_from(path).unwrap_or_else(|err| {
            warn!(error = %format!("{err:#}"), "ignoring unreadable viewer config");
            ViewerConfig::default()
        })
    } else {
        ViewerConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

pub fn load_config_from(path: &Path) -> anyhow::Result<ViewerConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read viewer config '{}'", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid viewer config '{}'", path.display()))
}

/// Parses a TOML document; keys missing from it keep their defaults, and
/// shortcut entries are merged over the default table.
pub fn parse_config(raw: &str) -> anyhow::Result<ViewerConfig> {
    let mut parsed: ViewerConfig = toml::from_str(raw)?;
    let mut shortcuts = ViewerConfig::default().shortcuts;
    shortcuts.append(&mut parsed.shortcuts);
    parsed.shortcuts = shortcuts;
    Ok(parsed)
}

pub fn apply_env_overrides(config: &mut ViewerConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut ViewerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__MESSAGES_DEFAULT_OPEN") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.messages_default_open = true,
            "0" | "false" | "no" => config.messages_default_open = false,
            other => warn!(value = other, "ignoring APP__MESSAGES_DEFAULT_OPEN"),
        }
    }
    if let Some(v) = lookup("APP__RESULTS_FONT_SIZE") {
        if let Ok(parsed) = v.trim().parse::<u32>() {
            config.results_font_size = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
