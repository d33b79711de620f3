use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn defaults_open_messages_and_bind_navigation_keys() {
    let config = ViewerConfig::default();
    assert!(config.messages_default_open);
    assert_eq!(config.results_font_size, 13);
    assert_eq!(config.shortcuts["event.nextGrid"], "ctrl+down");
    assert_eq!(config.shortcuts["event.saveAsCSV"], "");
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let config = parse_config(
        r#"
messagesDefaultOpen = false

[shortcuts]
"event.saveAsCSV" = "ctrl+shift+s"
"#,
    )
    .expect("parse");
    assert!(!config.messages_default_open);
    assert_eq!(config.results_font_size, 13);
    assert_eq!(config.shortcuts["event.saveAsCSV"], "ctrl+shift+s");
    assert_eq!(config.shortcuts["event.prevGrid"], "ctrl+up");
}

#[test]
fn malformed_file_is_an_error() {
    assert!(parse_config("resultsFontSize = \"big\"").is_err());
}

#[test]
fn overrides_replace_file_values() {
    let env: HashMap<&str, &str> = [
        ("APP__MESSAGES_DEFAULT_OPEN", "false"),
        ("APP__RESULTS_FONT_SIZE", "16"),
    ]
    .into_iter()
    .collect();
    let mut config = ViewerConfig::default();
    apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));
    assert!(!config.messages_default_open);
    assert_eq!(config.results_font_size, 16);
}

#[test]
fn unparseable_overrides_are_ignored() {
    let mut config = ViewerConfig::default();
    apply_overrides(&mut config, |key| match key {
        "APP__MESSAGES_DEFAULT_OPEN" => Some("maybe".into()),
        "APP__RESULTS_FONT_SIZE" => Some("large".into()),
        _ => None,
    });
    assert_eq!(config, ViewerConfig::default());
}

#[test]
fn loads_config_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("viewer_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("viewer.toml");
    fs::write(&path, "resultsFontSize = 18\n").expect("write config");

    let config = load_config_from(&path).expect("load");
    assert_eq!(config.results_font_size, 18);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_file_reports_path() {
    let err = load_config_from(Path::new("/definitely/not/here/viewer.toml"))
        .expect_err("missing file");
    assert!(format!("{err:#}").contains("viewer.toml"));
}
