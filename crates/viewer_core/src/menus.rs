//! Grid icon bar and context menu models.

use serde::{Deserialize, Serialize};
use shared::domain::{BatchId, ResultId, SaveFormat, SelectionRange};

use crate::services::TextRange;

pub const RESTORE_LABEL: &str = "Restore";
pub const MAXIMIZE_LABEL: &str = "Maximize";
pub const SAVE_CSV_LABEL: &str = "Save as CSV";
pub const SAVE_JSON_LABEL: &str = "Save as JSON";
pub const SAVE_EXCEL_LABEL: &str = "Save as Excel";
pub const MSG_CANNOT_SAVE_MULTIPLE_SELECTIONS: &str =
    "Save results command cannot be used with multiple selections.";

pub const GRID_ICON_COUNT: usize = GridIconKind::ALL.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridIconKind {
    Magnify,
    SaveCsv,
    SaveJson,
    SaveExcel,
}

impl GridIconKind {
    pub const ALL: [GridIconKind; 4] = [
        GridIconKind::Magnify,
        GridIconKind::SaveCsv,
        GridIconKind::SaveJson,
        GridIconKind::SaveExcel,
    ];

    pub fn save_format(self) -> Option<SaveFormat> {
        match self {
            GridIconKind::Magnify => None,
            GridIconKind::SaveCsv => Some(SaveFormat::Csv),
            GridIconKind::SaveJson => Some(SaveFormat::Json),
            GridIconKind::SaveExcel => Some(SaveFormat::Excel),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridIcon {
    pub kind: GridIconKind,
    pub icon: &'static str,
    pub hover_text: &'static str,
}

/// Icons shown on each grid's icon bar.
pub fn grid_icons(dataset_count: usize, magnified: bool) -> Vec<GridIcon> {
    GridIconKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let (icon, hover_text) = match kind {
                GridIconKind::Magnify if dataset_count <= 1 => return None,
                GridIconKind::Magnify if magnified => ("exitFullScreen", RESTORE_LABEL),
                GridIconKind::Magnify => ("extendFullScreen", MAXIMIZE_LABEL),
                GridIconKind::SaveCsv => ("saveCsv", SAVE_CSV_LABEL),
                GridIconKind::SaveJson => ("saveJson", SAVE_JSON_LABEL),
                GridIconKind::SaveExcel => ("saveExcel", SAVE_EXCEL_LABEL),
            };
            Some(GridIcon {
                kind,
                icon,
                hover_text,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextAction {
    #[serde(rename = "savecsv")]
    SaveCsv,
    #[serde(rename = "savejson")]
    SaveJson,
    #[serde(rename = "saveexcel")]
    SaveExcel,
    #[serde(rename = "selectall")]
    SelectAll,
    #[serde(rename = "copySelection")]
    CopySelection,
    #[serde(rename = "copyWithHeaders")]
    CopyWithHeaders,
    #[serde(rename = "copyAllHeaders")]
    CopyAllHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextClick {
    #[serde(rename = "type")]
    pub action: ContextAction,
    pub batch_id: BatchId,
    pub result_id: ResultId,
    pub index: usize,
    #[serde(default)]
    pub selection: Vec<SelectionRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMenuRequest {
    pub x: f64,
    pub y: f64,
    pub batch_id: BatchId,
    pub result_id: ResultId,
    pub index: usize,
    pub selection: Vec<SelectionRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagesContextAction {
    #[serde(rename = "copySelection")]
    CopySelection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessagesContextMenuRequest {
    pub x: f64,
    pub y: f64,
    pub selected_range: Option<TextRange>,
}
