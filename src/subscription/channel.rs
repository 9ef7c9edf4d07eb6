use crate::types::{RealtimeError, Result};
use serde::Serialize;
use std::fmt;

/// A named event channel: a doctype, optionally narrowed to one document.
///
/// Serializes as the SUBSCRIBE/UNSUBSCRIBE payload, `{"type": ..}` or
/// `{"type": .., "id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Channel {
    #[serde(rename = "type")]
    doctype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl Channel {
    /// Channel for every document of `doctype`
    pub fn new(doctype: impl Into<String>) -> Result<Self> {
        let doctype = doctype.into();
        validate("channel id", &doctype)?;
        Ok(Self { doctype, id: None })
    }

    /// Channel for a single document
    pub fn document(doctype: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate("document id", &id)?;
        let mut channel = Self::new(doctype)?;
        channel.id = Some(id);
        Ok(channel)
    }

    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Registry key, unique per client
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => format!("{}/{}", self.doctype, id),
            None => self.doctype.clone(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn validate(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RealtimeError::InvalidArgument(format!("{} must not be empty", what)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RealtimeError::InvalidArgument(format!(
            "{} '{}' contains whitespace or control characters",
            what,
            value.escape_debug()
        )));
    }
    Ok(())
}

/// Conversion into a validated [`Channel`].
///
/// Plain strings name a doctype channel.
pub trait IntoChannel {
    fn into_channel(self) -> Result<Channel>;
}

impl IntoChannel for Channel {
    fn into_channel(self) -> Result<Channel> {
        Ok(self)
    }
}

impl IntoChannel for &Channel {
    fn into_channel(self) -> Result<Channel> {
        Ok(self.clone())
    }
}

impl IntoChannel for &str {
    fn into_channel(self) -> Result<Channel> {
        Channel::new(self)
    }
}

impl IntoChannel for String {
    fn into_channel(self) -> Result<Channel> {
        Channel::new(self)
    }
}

impl IntoChannel for &String {
    fn into_channel(self) -> Result<Channel> {
        Channel::new(self.as_str())
    }
}
