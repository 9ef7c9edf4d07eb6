//! # Cozy Realtime Rust
//!
//! A client for realtime event subscriptions over one persistent WebSocket
//! session: authenticate, SUBSCRIBE/UNSUBSCRIBE to named channels (doctypes),
//! and receive every inbound event through listeners.
//!
//! Requests use the `{"method": ..., "payload": ...}` envelope:
//!
//! ```text
//! {"method":"AUTH","payload":"<token>"}
//! {"method":"SUBSCRIBE","payload":{"type":"io.cozy.files"}}
//! {"method":"UNSUBSCRIBE","payload":{"type":"io.cozy.files"}}
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cozy_realtime_rs::{EnvCredential, RealtimeClient, RealtimeClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RealtimeClient::new(RealtimeClientOptions::default())?;
//!
//!     client.on_event(|event| println!("{}", event.body())).await?;
//!     client.on_error(|error| eprintln!("realtime error: {}", error)).await?;
//!     client.subscribe("io.cozy.files").await?;
//!
//!     client
//!         .start_with_credentials("ws://cozy.tools:8080/realtime/", EnvCredential::new("COZY_TOKEN"))
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod subscription;
pub mod transport;
pub mod types;

pub use auth::{CredentialProvider, EnvCredential, StaticCredential};
pub use client::{ConnectionState, RealtimeClient, RealtimeClientBuilder, RealtimeClientOptions};
pub use infrastructure::Backoff;
pub use messaging::{EventKind, RealtimeEvent};
pub use subscription::{Channel, IntoChannel, Subscription, SubscriptionStatus};
pub use transport::{SessionEvents, Transport, TransportEvent, TransportHandle, WebSocketTransport};
pub use types::{OutboundRequest, RealtimeError, Result};
