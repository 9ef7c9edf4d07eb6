use super::RealtimeEvent;
use crate::types::RealtimeError;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type EventListener = Arc<dyn Fn(&RealtimeEvent) + Send + Sync + 'static>;
pub type ErrorListener = Arc<dyn Fn(&RealtimeError) + Send + Sync + 'static>;

/// Fans inbound events and connection errors out to registered listeners.
///
/// Listeners run synchronously, in registration order, on the client's driver task.
#[derive(Default)]
pub struct EventDispatcher {
    event_listeners: Vec<EventListener>,
    error_listeners: Vec<ErrorListener>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener(&mut self, listener: EventListener) {
        self.event_listeners.push(listener);
    }

    pub fn add_error_listener(&mut self, listener: ErrorListener) {
        self.error_listeners.push(listener);
    }

    /// Delivers an event to every event listener
    pub fn dispatch(&self, event: &RealtimeEvent) {
        tracing::debug!(
            "Dispatching event {} to {} listener(s)",
            event.kind().map(|k| k.to_string()).unwrap_or_default(),
            self.event_listeners.len()
        );
        for listener in &self.event_listeners {
            listener(event);
        }
    }

    /// Reports an error to every error listener
    pub fn emit_error(&self, error: &RealtimeError) {
        if self.error_listeners.is_empty() {
            tracing::warn!("Unhandled realtime error: {}", error);
            return;
        }
        for listener in &self.error_listeners {
            listener(error);
        }
    }
}

/// Builds a listener that forwards events into an unbounded channel.
///
/// The listener stays registered after the receiver is dropped and then
/// silently discards events.
pub fn channel_listener() -> (EventListener, mpsc::UnboundedReceiver<RealtimeEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener: EventListener = Arc::new(move |event: &RealtimeEvent| {
        if tx.send(event.clone()).is_err() {
            tracing::trace!("Event stream receiver dropped");
        }
    });
    (listener, rx)
}
