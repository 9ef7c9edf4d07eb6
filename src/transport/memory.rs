use super::{SessionEvents, Transport, TransportHandle};
use crate::types::{RealtimeError, Result};
use std::sync::{Arc, Mutex};
use url::Url;

/// In-process transport for tests: records sent frames and hands the test the
/// session callbacks so it can play the server side.
#[derive(Clone, Default)]
pub(crate) struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    endpoints: Vec<Url>,
    sessions: Vec<SessionEvents>,
    sent: Vec<String>,
    closed: usize,
    fail_open: bool,
    fail_send: bool,
}

impl MemoryTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Callbacks of the most recently opened session
    pub(crate) fn session(&self) -> SessionEvents {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .last()
            .cloned()
            .expect("no session opened yet")
    }

    pub(crate) fn open_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub(crate) fn endpoints(&self) -> Vec<Url> {
        self.inner.lock().unwrap().endpoints.clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.inner.lock().unwrap().closed
    }

    /// Every frame sent so far, across sessions
    pub(crate) fn sent(&self) -> Vec<String> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub(crate) fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().unwrap().sent)
    }

    pub(crate) fn fail_open(&self, fail: bool) {
        self.inner.lock().unwrap().fail_open = fail;
    }

    pub(crate) fn fail_send(&self, fail: bool) {
        self.inner.lock().unwrap().fail_send = fail;
    }
}

impl Transport for MemoryTransport {
    fn open(&self, endpoint: &Url, events: SessionEvents) -> Result<Box<dyn TransportHandle>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_open {
            return Err(RealtimeError::Transport("connection refused".to_string()));
        }
        inner.endpoints.push(endpoint.clone());
        inner.sessions.push(events);
        Ok(Box::new(MemoryHandle {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemoryHandle {
    inner: Arc<Mutex<Inner>>,
}

impl TransportHandle for MemoryHandle {
    fn send(&self, text: String) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_send {
            return Err(RealtimeError::Transport("broken pipe".to_string()));
        }
        inner.sent.push(text);
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.inner.lock().unwrap().closed += 1;
    }
}
