use serde::Serialize;

use crate::subscription::Channel;
use crate::types::constants::methods;

/// A request sent to the server.
///
/// Serializes to the `{"method": ..., "payload": ...}` envelope. AUTH carries the
/// credential string, SUBSCRIBE/UNSUBSCRIBE carry the channel object.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "method", content = "payload", rename_all = "UPPERCASE")]
pub enum OutboundRequest {
    Auth(String),
    Subscribe(Channel),
    Unsubscribe(Channel),
}

impl OutboundRequest {
    pub fn auth(credential: impl Into<String>) -> Self {
        Self::Auth(credential.into())
    }

    pub fn subscribe(channel: &Channel) -> Self {
        Self::Subscribe(channel.clone())
    }

    pub fn unsubscribe(channel: &Channel) -> Self {
        Self::Unsubscribe(channel.clone())
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Auth(_) => methods::AUTH,
            Self::Subscribe(_) => methods::SUBSCRIBE,
            Self::Unsubscribe(_) => methods::UNSUBSCRIBE,
        }
    }

    /// Encodes the request as the text frame sent on the wire
    pub fn to_text(&self) -> crate::types::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_envelope() {
        let json = OutboundRequest::auth("tok123").to_text().unwrap();
        assert_eq!(json, r#"{"method":"AUTH","payload":"tok123"}"#);
    }

    #[test]
    fn test_subscribe_envelope() {
        let channel = Channel::new("io.cozy.files").unwrap();
        let json = OutboundRequest::subscribe(&channel).to_text().unwrap();
        assert_eq!(
            json,
            r#"{"method":"SUBSCRIBE","payload":{"type":"io.cozy.files"}}"#
        );
    }

    #[test]
    fn test_unsubscribe_envelope_with_document_id() {
        let channel = Channel::document("io.cozy.files", "abc123").unwrap();
        let json = OutboundRequest::unsubscribe(&channel).to_text().unwrap();
        assert_eq!(
            json,
            r#"{"method":"UNSUBSCRIBE","payload":{"type":"io.cozy.files","id":"abc123"}}"#
        );
    }

    #[test]
    fn test_method_names() {
        let channel = Channel::new("io.cozy.notes").unwrap();
        assert_eq!(OutboundRequest::auth("t").method(), "AUTH");
        assert_eq!(OutboundRequest::subscribe(&channel).method(), "SUBSCRIBE");
        assert_eq!(OutboundRequest::unsubscribe(&channel).method(), "UNSUBSCRIBE");
    }
}
