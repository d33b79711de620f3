use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{BatchId, LinkType, ResultId, SaveFormat, SelectionData, SelectionRange},
    protocol::{DataEnvelope, DbCellValue, ResultSetSubset},
};
use tokio::sync::mpsc;
use viewer_core::{
    config::ViewerConfig,
    layout::LayoutMetrics,
    services::{Clipboard, DataService, GridSurface, TextRange, TextRegion, TextSelectionProvider},
    shortcuts::KeymapShortcuts,
    ResultsView, UiInput, ViewerRuntime, ViewerServices,
};

#[derive(Default)]
struct RecordingService {
    log: Mutex<Vec<String>>,
}

impl RecordingService {
    fn log(&self) -> Vec<String> {
        self.log.lock().expect("log").clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().expect("log").push(entry);
    }
}

#[async_trait]
impl DataService for RecordingService {
    async fn config(&self) -> Result<ViewerConfig> {
        Ok(ViewerConfig::default())
    }

    async fn fetch_rows(
        &self,
        offset: u64,
        count: u64,
        _batch_id: BatchId,
        _result_id: ResultId,
    ) -> Result<ResultSetSubset> {
        let rows = (offset..offset + count)
            .map(|row| vec![DbCellValue::new(format!("<doc id=\"{row}\"/>"))])
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
        self.push(format!(
            "copy {batch_id}/{result_id} headers={include_headers} ranges={}",
            selection.map_or(0, |s| s.len())
        ));
        Ok(())
    }

    async fn send_save_request(
        &self,
        batch_id: BatchId,
        result_id: ResultId,
        format: SaveFormat,
        selection: Vec<SelectionRange>,
    ) -> Result<()> {
        self.push(format!(
            "save {batch_id}/{result_id} {format} ranges={}",
            selection.len()
        ));
        Ok(())
    }

    async fn open_link(&self, value: &str, column_name: &str, link_type: LinkType) -> Result<()> {
        self.push(format!("link {} {column_name} {value}", link_type.as_str()));
        Ok(())
    }

    async fn set_editor_selection(&self, selection: SelectionData) -> Result<()> {
        self.push(format!("editor {}", selection.start_line));
        Ok(())
    }

    async fn send_ready_event(&self, uri: &str) -> Result<()> {
        self.push(format!("ready {uri}"));
        Ok(())
    }

    async fn show_warning(&self, message: &str) -> Result<()> {
        self.push(format!("warn {message}"));
        Ok(())
    }
}

struct StaticSurface {
    selection: Vec<SelectionRange>,
}

impl GridSurface for StaticSurface {
    fn selected_ranges(&self, _grid: usize) -> Vec<SelectionRange> {
        self.selection.clone()
    }
    fn set_active(&self, _grid: usize) {}
    fn set_active_cell(&self, _grid: usize, _row: usize, _cell: usize) {}
    fn set_select_all(&self, _grid: usize, _selected: bool) {}
    fn notify_resized(&self, _grid: usize) {}
    fn scroll_results_to(&self, _scroll_top: f64) {}
    fn scroll_messages_to_bottom(&self) {}
    fn set_messages_selectable(&self, _selectable: bool) {}
    fn set_results_height(&self, _height: f64) {}
    fn set_messages_min_height(&self, _height: f64) {}
    fn metrics(&self) -> LayoutMetrics {
        LayoutMetrics {
            grid_height: 280.0,
            results_height: 560.0,
            scrollable_height: 582.0,
            window_height: 800.0,
            messages_height: 180.0,
        }
    }
}

struct NoText;

impl TextSelectionProvider for NoText {
    fn get_selection(&self) -> Vec<TextRange> {
        Vec::new()
    }
    fn create_range(&self, _region: TextRegion) -> Option<TextRange> {
        None
    }
    fn clear_selection(&self) {}
    fn text(&self, _range: &TextRange) -> String {
        String::new()
    }
}

struct NoClipboard;

impl Clipboard for NoClipboard {
    fn copy_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

fn view(data: Arc<RecordingService>, selection: Vec<SelectionRange>) -> ResultsView {
    ResultsView::new(ViewerServices {
        data,
        shortcuts: Arc::new(KeymapShortcuts::new(&ViewerConfig::default().shortcuts)),
        surface: Arc::new(StaticSurface { selection }),
        text: Arc::new(NoText),
        clipboard: Arc::new(NoClipboard),
    })
}

fn envelopes() -> Vec<DataEnvelope> {
    serde_json::from_value(json!([
        { "type": "start", "data": "file:///queries/plan.sql" },
        {
            "type": "resultSet",
            "data": {
                "batchId": 0,
                "id": 0,
                "rowCount": 3,
                "columnInfo": [{ "columnName": "Microsoft SQL Server 2005 XML Showplan", "isXml": true }]
            }
        },
        { "type": "message", "data": { "message": "(3 rows affected)", "isError": false } },
        { "type": "complete", "data": 18 }
    ]))
    .expect("envelopes")
}

#[tokio::test(start_paused = true)]
async fn query_run_end_to_end() {
    let data = Arc::new(RecordingService::default());
    let (events_tx, events_rx) = mpsc::channel(8);
    let (inputs_tx, inputs_rx) = mpsc::channel(8);
    for envelope in envelopes() {
        events_tx.send(envelope).await.expect("event");
    }
    drop(events_tx);

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let inputs: Vec<UiInput> = serde_json::from_value(json!([
            { "type": "linkClick", "grid": 0, "row": 1, "column": 0 },
            { "type": "iconClick", "icon": "save_csv", "index": 0 },
            { "type": "key", "code": "KeyC", "key": "c", "ctrl": true, "target": "grid_cell" }
        ]))
        .expect("inputs");
        for input in inputs {
            inputs_tx.send(input).await.expect("input");
        }
    });

    let view = ViewerRuntime::new(
        view(Arc::clone(&data), vec![SelectionRange::new(0, 0, 1, 0)]),
        "panel-1",
    )
    .run(events_rx, inputs_rx)
    .await;

    let snapshot = view.snapshot();
    assert!(snapshot.complete);
    assert_eq!(snapshot.uri.as_deref(), Some("file:///queries/plan.sql"));
    assert_eq!(snapshot.datasets[0].columns, vec!["XML Showplan".to_string()]);
    assert!(snapshot.datasets[0].attached);

    assert_eq!(
        data.log(),
        vec![
            "ready panel-1".to_string(),
            "link xml XML Showplan <doc id=\"1\"/>".to_string(),
            "save 0/0 csv ranges=1".to_string(),
            "copy 0/0 headers=false ranges=1".to_string(),
        ]
    );
}

#[tokio::test]
async fn disjoint_selection_blocks_every_save_path() {
    let data = Arc::new(RecordingService::default());
    let mut view = view(
        Arc::clone(&data),
        vec![SelectionRange::single_cell(0, 0), SelectionRange::single_cell(2, 0)],
    );
    for envelope in envelopes() {
        view.handle_envelope(envelope);
    }
    view.run_windowing_pass(0.0);

    view.save_active(SaveFormat::Json).await.expect("save");
    assert_eq!(
        data.log(),
        vec!["warn Save results command cannot be used with multiple selections.".to_string()]
    );
}
