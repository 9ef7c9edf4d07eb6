use super::{SessionEvents, Transport, TransportHandle};
use crate::client::RealtimeClientOptions;
use crate::infrastructure::{Heartbeat, HeartbeatTick};
use crate::types::{CLOSE_GRACE_PERIOD, DEFAULT_TIMEOUT, RealtimeError, Result};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use url::Url;

/// [`Transport`] over a WebSocket connection (tokio-tungstenite).
///
/// Each session runs in its own task which owns the socket: it performs the
/// handshake, forwards inbound text frames, writes queued outbound frames and
/// sends heartbeat pings when configured.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    protocol: Option<String>,
    connect_timeout: Duration,
    heartbeat_interval: Option<Duration>,
}

impl WebSocketTransport {
    pub fn new(options: &RealtimeClientOptions) -> Self {
        Self {
            protocol: options.protocol.clone(),
            connect_timeout: Duration::from_millis(options.timeout.unwrap_or(DEFAULT_TIMEOUT)),
            heartbeat_interval: options.heartbeat_interval.map(Duration::from_millis),
        }
    }

    /// Build the handshake request, with the sub-protocol header if configured
    fn build_request(&self, endpoint: &Url) -> Result<Request> {
        let mut request = endpoint.as_str().into_client_request()?;

        if let Some(protocol) = &self.protocol {
            let value = HeaderValue::from_str(protocol).map_err(|e| {
                RealtimeError::InvalidArgument(format!("invalid sub-protocol '{}': {}", protocol, e))
            })?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        Ok(request)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(&RealtimeClientOptions::default())
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, endpoint: &Url, events: SessionEvents) -> Result<Box<dyn TransportHandle>> {
        let request = self.build_request(endpoint)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let opened = Arc::new(AtomicBool::new(false));

        tracing::info!("Connecting to {}", endpoint);
        let task = tokio::spawn(run_session(
            request,
            self.connect_timeout,
            Heartbeat::new(self.heartbeat_interval),
            outbound_rx,
            Arc::clone(&opened),
            events,
        ));

        Ok(Box::new(WebSocketHandle {
            outbound: outbound_tx,
            task: Some(task),
            opened,
        }))
    }
}

enum Outgoing {
    Text(String),
    Close,
}

struct WebSocketHandle {
    outbound: mpsc::UnboundedSender<Outgoing>,
    task: Option<JoinHandle<()>>,
    opened: Arc<AtomicBool>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, text: String) -> Result<()> {
        self.outbound
            .send(Outgoing::Text(text))
            .map_err(|_| RealtimeError::Transport("session task has stopped".to_string()))
    }

    fn close(mut self: Box<Self>) {
        let Some(mut task) = self.task.take() else {
            return;
        };

        // Mid-handshake there is nothing to close gracefully.
        if !self.opened.load(Ordering::Acquire) || self.outbound.send(Outgoing::Close).is_err() {
            task.abort();
            return;
        }

        tokio::spawn(async move {
            let grace = Duration::from_millis(CLOSE_GRACE_PERIOD);
            if time::timeout(grace, &mut task).await.is_err() {
                tracing::warn!("Close handshake did not finish in {:?}, aborting session", grace);
                task.abort();
            }
        });
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_session(
    request: Request,
    connect_timeout: Duration,
    mut heartbeat: Heartbeat,
    mut outbound: mpsc::UnboundedReceiver<Outgoing>,
    opened: Arc<AtomicBool>,
    events: SessionEvents,
) {
    let ws_stream = match time::timeout(connect_timeout, tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((stream, response))) => {
            tracing::debug!("Handshake completed with status {}", response.status());
            stream
        }
        Ok(Err(e)) => {
            tracing::error!("WebSocket handshake failed: {}", e);
            events.error(e.into());
            return;
        }
        Err(_) => {
            tracing::error!("WebSocket handshake timed out after {:?}", connect_timeout);
            events.error(RealtimeError::Timeout);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    opened.store(true, Ordering::Release);
    events.opened();
    tracing::info!("Connected to WebSocket server");

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(Outgoing::Text(text)) => {
                    tracing::debug!("Sending text message: {}", text);
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::error!("WebSocket write error: {}", e);
                        events.error(e.into());
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    if let Err(e) = write.close().await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Received text message: {}", text.as_str());
                    events.message(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    events.error(RealtimeError::Protocol(format!(
                        "unexpected binary message ({} bytes)",
                        data.len()
                    )));
                }
                Some(Ok(Message::Ping(data))) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(Message::Pong(data))) => heartbeat.ack(&data),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|frame| {
                        format!("code={} reason='{}'", u16::from(frame.code), frame.reason.as_str())
                    });
                    tracing::warn!(
                        "Server closed connection: {}",
                        reason.as_deref().unwrap_or("no close frame")
                    );
                    events.closed(reason);
                    break;
                }
                Some(Ok(Message::Frame(_))) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    events.error(e.into());
                    break;
                }
                None => {
                    tracing::warn!("WebSocket stream ended");
                    events.closed(None);
                    break;
                }
            },
            tick = heartbeat.tick() => match tick {
                HeartbeatTick::Ping(payload) => {
                    if let Err(e) = write.send(Message::Ping(payload.into())).await {
                        tracing::error!("[Heartbeat] Failed to send: {}", e);
                        events.error(e.into());
                        break;
                    }
                }
                HeartbeatTick::TimedOut => {
                    events.error(RealtimeError::Timeout);
                    break;
                }
            },
        }
    }

    tracing::info!("Session task finished");
}
