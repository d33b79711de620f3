//! Cell and header text formatting for the grid surface.

use shared::protocol::DbCellValue;

const CELL_CLASSES: &str = "grid-cell-value-container";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormatter {
    Text,
    HyperLink,
}

/// Encodes `<>&"'` and everything in U+00A0..=U+9999 as numeric entities.
pub fn html_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let code = ch as u32;
        if matches!(ch, '<' | '>' | '&' | '"' | '\'') || (0x00A0..=0x9999).contains(&code) {
            out.push_str(&format!("&#{code};"));
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn format_cell(formatter: CellFormatter, value: Option<&DbCellValue>) -> String {
    match formatter {
        CellFormatter::Text => text_cell(value),
        CellFormatter::HyperLink => hyperlink_cell(value),
    }
}

fn text_cell(value: Option<&DbCellValue>) -> String {
    let mut classes = CELL_CLASSES.to_string();
    let display = match value {
        Some(value) => {
            if value.is_null {
                classes.push_str(" missing-value");
            }
            html_entities(&flatten_newlines(&value.display_value))
        }
        None => String::new(),
    };
    format!("<span title=\"{display}\" class=\"{classes}\">{display}</span>")
}

fn hyperlink_cell(value: Option<&DbCellValue>) -> String {
    match value {
        Some(value) if value.is_null => text_cell(Some(value)),
        Some(value) => format!(
            "<a class=\"{CELL_CLASSES} xmlLink\" href=\"#\" >{}</a>",
            html_entities(&value.display_value)
        ),
        None => format!("<span class=\"{CELL_CLASSES} missing-value\"></span>"),
    }
}

fn flatten_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Raw display string used when a link cell is clicked.
pub fn cell_value_string(values: &[DbCellValue], column: usize) -> String {
    values
        .get(column)
        .map(|value| value.display_value.clone())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;
