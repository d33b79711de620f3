use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unexpected proxy event type \"{0}\" sent")]
    UnexpectedType(String),
    #[error("malformed \"{kind}\" event payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EventDecodeError {
    pub fn kind(&self) -> &str {
        match self {
            EventDecodeError::UnexpectedType(kind) => kind,
            EventDecodeError::Payload { kind, .. } => kind,
        }
    }
}
