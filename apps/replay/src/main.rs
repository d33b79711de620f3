mod headless;

use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use headless::{HeadlessSurface, NoTextSelection, ScriptedDataService, StdoutClipboard};
use serde::Deserialize;
use shared::{
    domain::{BatchId, ResultId},
    protocol::{DataEnvelope, DbCellValue},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer_core::{
    config::{load_config, load_config_from},
    layout::LayoutMetrics,
    shortcuts::KeymapShortcuts,
    ResultsView, UiInput, ViewerRuntime, ViewerServices,
};

/// Replays a recorded query session against the results viewer and prints
/// the final view state as JSON.
#[derive(Parser, Debug)]
struct Args {
    /// JSON-lines script of events, inputs, row tables and waits.
    script: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "untitled:replay")]
    uri: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "camelCase")]
enum ReplayStep {
    Event(DataEnvelope),
    Input(UiInput),
    Rows(ScriptedRows),
    Metrics(LayoutMetrics),
    Wait(u64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptedRows {
    batch_id: BatchId,
    result_id: ResultId,
    rows: Vec<Vec<DbCellValue>>,
}

fn parse_script(raw: &str) -> Result<Vec<ReplayStep>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid step", index + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    let raw = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read replay script '{}'", args.script.display()))?;
    let steps = parse_script(&raw)
        .with_context(|| format!("invalid replay script '{}'", args.script.display()))?;
    info!(steps = steps.len(), uri = %args.uri, "replaying script");

    let data = Arc::new(ScriptedDataService::new(config.clone()));
    let surface = Arc::new(HeadlessSurface::default());
    let view = ResultsView::new(ViewerServices {
        data: data.clone(),
        shortcuts: Arc::new(KeymapShortcuts::new(&config.shortcuts)),
        surface: surface.clone(),
        text: Arc::new(NoTextSelection),
        clipboard: Arc::new(StdoutClipboard),
    });

    let (events_tx, events_rx) = mpsc::channel(64);
    let (inputs_tx, inputs_rx) = mpsc::channel(64);
    let feeder = tokio::spawn(async move {
        for step in steps {
            match step {
                ReplayStep::Event(envelope) => events_tx.send(envelope).await?,
                ReplayStep::Input(input) => inputs_tx.send(input).await?,
                ReplayStep::Rows(rows) => {
                    data.register_rows(rows.batch_id, rows.result_id, rows.rows)
                }
                ReplayStep::Metrics(metrics) => surface.set_metrics(metrics),
                ReplayStep::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            }
        }
        anyhow::Ok(())
    });

    let view = ViewerRuntime::new(view, args.uri).run(events_rx, inputs_rx).await;
    feeder.await.context("replay feeder panicked")??;

    println!("{}", serde_json::to_string_pretty(&view.snapshot())?);
    Ok(())
}
