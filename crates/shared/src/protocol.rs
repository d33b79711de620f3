use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{BatchId, ResultId, SelectionData},
    error::EventDecodeError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCellValue {
    pub display_value: String,
    #[serde(default)]
    pub is_null: bool,
}

impl DbCellValue {
    pub fn new(display_value: impl Into<String>) -> Self {
        Self {
            display_value: display_value.into(),
            is_null: false,
        }
    }

    pub fn null() -> Self {
        Self {
            display_value: "NULL".to_string(),
            is_null: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbColumn {
    pub column_name: String,
    #[serde(default)]
    pub is_xml: bool,
    #[serde(default)]
    pub is_json: bool,
}

impl DbColumn {
    pub fn plain(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            is_xml: false,
            is_json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetSummary {
    pub batch_id: BatchId,
    pub id: ResultId,
    pub row_count: u64,
    #[serde(default)]
    pub column_info: Vec<DbColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetSubset {
    pub row_count: u64,
    pub rows: Vec<Vec<DbCellValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLink {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub message: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<MessageLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionData>,
}

impl MessageRecord {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            batch_id: None,
            time: None,
            message: message.into(),
            is_error: false,
            link: None,
            selection: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum DataEvent {
    Start(String),
    Complete(u64),
    Message(MessageRecord),
    ResultSet(ResultSetSummary),
}

impl DataEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DataEvent::Start(_) => "start",
            DataEvent::Complete(_) => "complete",
            DataEvent::Message(_) => "message",
            DataEvent::ResultSet(_) => "resultSet",
        }
    }
}

/// Raw `{type, data}` frame as delivered by the data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl DataEnvelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

impl From<DataEvent> for DataEnvelope {
    fn from(event: DataEvent) -> Self {
        let kind = event.kind().to_string();
        let data = match event {
            DataEvent::Start(uri) => Value::String(uri),
            DataEvent::Complete(elapsed_ms) => Value::from(elapsed_ms),
            DataEvent::Message(message) => serde_json::to_value(message).unwrap_or(Value::Null),
            DataEvent::ResultSet(result_set) => {
                serde_json::to_value(result_set).unwrap_or(Value::Null)
            }
        };
        Self { kind, data }
    }
}

impl TryFrom<DataEnvelope> for DataEvent {
    type Error = EventDecodeError;

    fn try_from(envelope: DataEnvelope) -> Result<Self, Self::Error> {
        let DataEnvelope { kind, data } = envelope;
        let decoded = match kind.as_str() {
            "start" => serde_json::from_value(data).map(DataEvent::Start),
            "complete" => serde_json::from_value(data).map(DataEvent::Complete),
            "message" => serde_json::from_value(data).map(DataEvent::Message),
            "resultSet" => serde_json::from_value(data).map(DataEvent::ResultSet),
            _ => return Err(EventDecodeError::UnexpectedType(kind)),
        };
        decoded.map_err(|source| EventDecodeError::Payload { kind, source })
    }
}
