use thiserror::Error;

/// Errors that can occur when using the realtime client.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Transport session failure (connect, send or close)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed inbound message. The message is dropped, the session stays open.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Rejected caller input (empty channel id, bad endpoint scheme, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Credential lookup failed at authentication time
    #[error("Authentication error: {0}")]
    Auth(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Handshake or liveness deadline exceeded
    #[error("Timeout error")]
    Timeout,

    /// The client's driver task is gone
    #[error("Client closed")]
    ClientClosed,
}

impl RealtimeError {
    /// Whether this error ends the transport session when it happens mid-session.
    ///
    /// Protocol errors only drop the offending message; caller input errors
    /// never reach the session at all.
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(
            self,
            Self::Protocol(_) | Self::InvalidArgument(_) | Self::UrlParse(_)
        )
    }
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
