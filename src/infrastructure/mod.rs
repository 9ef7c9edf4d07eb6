// Infrastructure module - timers shared by the transport and by callers
pub mod heartbeat;
pub mod timer;

pub use heartbeat::{Heartbeat, HeartbeatTick};
pub use timer::Backoff;
