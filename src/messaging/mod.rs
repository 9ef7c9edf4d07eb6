// Messaging module - inbound events and listener fan-out
pub mod dispatcher;
pub mod event;

pub use dispatcher::{ErrorListener, EventDispatcher, EventListener, channel_listener};
pub use event::{EventKind, RealtimeEvent};
