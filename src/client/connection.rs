use crate::transport::TransportHandle;
use crate::types::{OutboundRequest, Result};

/// Lifecycle of the client's transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started
    Idle,
    /// Waiting for the transport to report the session open
    Connecting,
    /// AUTH being sent
    Authenticating,
    /// Requests flow; subscriptions are sent immediately
    Ready,
    /// Stopped or failed. `start` re-enters `Connecting`.
    Closed,
}

impl ConnectionState {
    /// Whether a session is underway (connecting, authenticating or ready)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Authenticating | Self::Ready)
    }
}

/// The one live transport session, owned by the driver
pub(crate) struct Session {
    epoch: u64,
    handle: Box<dyn TransportHandle>,
}

impl Session {
    pub(crate) fn new(epoch: u64, handle: Box<dyn TransportHandle>) -> Self {
        Self { epoch, handle }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Encodes and enqueues a request on the transport
    pub(crate) fn send(&self, request: &OutboundRequest) -> Result<()> {
        let text = request.to_text()?;
        tracing::debug!("Sending {} request: {}", request.method(), text);
        self.handle.send(text)
    }

    pub(crate) fn close(self) {
        tracing::debug!("Closing session {}", self.epoch);
        self.handle.close();
    }
}
