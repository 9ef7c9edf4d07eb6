// Module declarations
mod builder;
mod connection;
mod core;
mod driver;
mod state;

#[cfg(test)]
mod tests;

// Public API exports
pub use self::core::RealtimeClient;
pub use builder::{RealtimeClientBuilder, RealtimeClientOptions};
pub use connection::ConnectionState;
pub(crate) use driver::DriverInput;
