use super::driver::ClientDriver;
use super::{ConnectionState, RealtimeClient};
use crate::transport::{Transport, WebSocketTransport};
use crate::types::{RealtimeError, Result, env_vars};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Client configuration.
///
/// Durations are in milliseconds; `None` keeps the default.
#[derive(Debug, Clone, Default)]
pub struct RealtimeClientOptions {
    /// WebSocket sub-protocol to request (e.g. `io.cozy.websocket`)
    pub protocol: Option<String>,
    /// Handshake timeout. Default: 10 000 ms.
    pub timeout: Option<u64>,
    /// Ping interval for liveness checks. Default: disabled.
    pub heartbeat_interval: Option<u64>,
}

impl RealtimeClientOptions {
    /// Reads `REALTIME_PROTOCOL`, `REALTIME_TIMEOUT_MS` and `REALTIME_HEARTBEAT_MS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            protocol: std::env::var(env_vars::PROTOCOL).ok(),
            timeout: env_millis(env_vars::TIMEOUT_MS)?,
            heartbeat_interval: env_millis(env_vars::HEARTBEAT_MS)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if let Some(protocol) = &self.protocol
            && protocol.trim().is_empty()
        {
            return Err(RealtimeError::InvalidArgument(
                "sub-protocol must not be blank".to_string(),
            ));
        }
        if self.timeout == Some(0) {
            return Err(RealtimeError::InvalidArgument(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval == Some(0) {
            return Err(RealtimeError::InvalidArgument(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_millis(var: &str) -> Result<Option<u64>> {
    match std::env::var(var) {
        Ok(value) => value.trim().parse::<u64>().map(Some).map_err(|e| {
            RealtimeError::InvalidArgument(format!("{}='{}' is not a number of milliseconds: {}", var, value, e))
        }),
        Err(_) => Ok(None),
    }
}

/// Builder for RealtimeClient that handles initialization
pub struct RealtimeClientBuilder {
    options: RealtimeClientOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl RealtimeClientBuilder {
    /// Create a new builder
    pub fn new(options: RealtimeClientOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            transport: None,
        })
    }

    /// Use another transport instead of WebSocket
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client and spawn its driver task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> RealtimeClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new(&self.options)));

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        let driver = ClientDriver::new(transport, inputs_rx, inputs_tx.downgrade(), state_tx);
        tokio::spawn(driver.run());

        RealtimeClient {
            inputs: inputs_tx,
            state: state_rx,
        }
    }
}
