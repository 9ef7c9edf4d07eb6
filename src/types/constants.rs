/// Outbound request methods (magic strings layer)
pub mod methods {
    pub const AUTH: &str = "AUTH";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
}

/// Event names the server puts in the `event` field of inbound messages
pub mod server_events {
    pub const CREATED: &str = "CREATED";
    pub const UPDATED: &str = "UPDATED";
    pub const DELETED: &str = "DELETED";
    pub const NOTIFIED: &str = "NOTIFIED";
    pub const ERROR: &str = "error";
}

/// Default connect timeout (milliseconds)
pub const DEFAULT_TIMEOUT: u64 = 10000;

/// Grace period for a close handshake before the session task is aborted (milliseconds)
pub const CLOSE_GRACE_PERIOD: u64 = 1000;

/// Default reconnect intervals (milliseconds)
pub const RECONNECT_INTERVALS: [u64; 4] = [1000, 2000, 5000, 10000];
pub const DEFAULT_RECONNECT_FALLBACK: u64 = 10000;

/// Environment variables read by `RealtimeClientOptions::from_env`
pub mod env_vars {
    pub const PROTOCOL: &str = "REALTIME_PROTOCOL";
    pub const TIMEOUT_MS: &str = "REALTIME_TIMEOUT_MS";
    pub const HEARTBEAT_MS: &str = "REALTIME_HEARTBEAT_MS";
}
