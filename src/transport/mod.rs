//! Transport boundary: the persistent-connection primitive the client drives.
//!
//! A [`Transport`] opens sessions. Each session reports what happens to it
//! through the [`SessionEvents`] it was opened with, and is written to and
//! closed through the [`TransportHandle`] returned by `open`.

#[cfg(test)]
pub(crate) mod memory;
mod websocket;

pub use websocket::WebSocketTransport;

use crate::client::DriverInput;
use crate::types::{RealtimeError, Result};
use tokio::sync::mpsc;
use url::Url;

/// Something that happened to a transport session
#[derive(Debug)]
pub enum TransportEvent {
    /// The session is open and can carry requests
    Open,
    /// One inbound text frame
    Message(String),
    /// A failure. Anything but a protocol error ends the session.
    Error(RealtimeError),
    /// The peer or the network closed the session
    Closed(Option<String>),
}

/// Opens transport sessions
pub trait Transport: Send + Sync + 'static {
    /// Starts opening a session to `endpoint`.
    ///
    /// Returns as soon as the attempt is underway; [`TransportEvent::Open`] is
    /// reported through `events` once the session can carry requests.
    fn open(&self, endpoint: &Url, events: SessionEvents) -> Result<Box<dyn TransportHandle>>;
}

/// Write side of one open (or opening) session
pub trait TransportHandle: Send {
    /// Enqueues a text frame. Success means the transport accepted it, not that
    /// the server received it.
    fn send(&self, text: String) -> Result<()>;

    /// Releases the session, whatever state it is in
    fn close(self: Box<Self>);
}

/// Reports session events to the client that opened the session.
///
/// Events are tagged with the session they belong to; once the client has moved
/// on to another session (or is gone) they are ignored.
#[derive(Clone)]
pub struct SessionEvents {
    epoch: u64,
    inputs: mpsc::WeakUnboundedSender<DriverInput>,
}

impl SessionEvents {
    pub(crate) fn new(epoch: u64, inputs: mpsc::WeakUnboundedSender<DriverInput>) -> Self {
        Self { epoch, inputs }
    }

    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    pub fn error(&self, error: RealtimeError) -> bool {
        self.emit(TransportEvent::Error(error))
    }

    pub fn closed(&self, reason: Option<String>) -> bool {
        self.emit(TransportEvent::Closed(reason))
    }

    /// Returns `false` once the client is gone
    pub fn emit(&self, event: TransportEvent) -> bool {
        let Some(inputs) = self.inputs.upgrade() else {
            return false;
        };
        inputs
            .send(DriverInput::Transport {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}
