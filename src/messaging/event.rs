use crate::types::constants::server_events;
use crate::types::{RealtimeError, Result};
use serde_json::Value;

/// Type-safe server event names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A document was created
    Created,

    /// A document was updated
    Updated,

    /// A document was deleted
    Deleted,

    /// Notification without a stored document
    Notified,

    /// Server-side error report
    Error,

    /// Any other event name
    Custom(String),
}

impl EventKind {
    /// Parse a string into an EventKind
    pub fn parse(s: &str) -> Self {
        match s {
            server_events::CREATED => Self::Created,
            server_events::UPDATED => Self::Updated,
            server_events::DELETED => Self::Deleted,
            server_events::NOTIFIED => Self::Notified,
            server_events::ERROR => Self::Error,
            _ => Self::Custom(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => server_events::CREATED,
            Self::Updated => server_events::UPDATED,
            Self::Deleted => server_events::DELETED,
            Self::Notified => server_events::NOTIFIED,
            Self::Error => server_events::ERROR,
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inbound message delivered to listeners.
///
/// The body is kept as raw JSON. Servers usually send
/// `{"event": "CREATED", "payload": {"type": .., "id": .., "doc": {..}}}`, and the
/// accessors below read that shape when present.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    body: Value,
}

impl RealtimeEvent {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Parses one text frame. Anything that is not JSON is a protocol error.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str::<Value>(text)
            .map(Self::new)
            .map_err(|e| {
                RealtimeError::Protocol(format!("malformed message ({}): {}", e, truncate(text)))
            })
    }

    /// The full message body
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.body
            .get("event")
            .and_then(Value::as_str)
            .map(EventKind::parse)
    }

    /// The `payload` member, if any
    pub fn payload(&self) -> Option<&Value> {
        self.body.get("payload")
    }

    pub fn doctype(&self) -> Option<&str> {
        self.payload()?.get("type")?.as_str()
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.payload()?.get("id")?.as_str()
    }

    pub fn doc(&self) -> Option<&Value> {
        self.payload()?.get("doc")
    }
}

fn truncate(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
