use super::connection::{ConnectionState, Session};
use super::state::ClientState;
use crate::auth::{self, CredentialProvider};
use crate::messaging::{ErrorListener, EventListener, RealtimeEvent};
use crate::subscription::{Channel, Subscription, SubscriptionStatus};
use crate::transport::{SessionEvents, Transport, TransportEvent};
use crate::types::{OutboundRequest, RealtimeError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

/// Everything the driver reacts to, in arrival order
pub(crate) enum DriverInput {
    Command(Command),
    Transport { epoch: u64, event: TransportEvent },
}

/// Caller operations, each answered once processed
pub(crate) enum Command {
    Start {
        endpoint: Url,
        credentials: Option<Arc<dyn CredentialProvider>>,
        reply: oneshot::Sender<()>,
    },
    Subscribe {
        channel: Channel,
        reply: oneshot::Sender<()>,
    },
    Unsubscribe {
        channel: Channel,
        reply: oneshot::Sender<Option<Subscription>>,
    },
    OnEvent {
        listener: EventListener,
        reply: oneshot::Sender<()>,
    },
    OnError {
        listener: ErrorListener,
        reply: oneshot::Sender<()>,
    },
    Subscriptions {
        reply: oneshot::Sender<Vec<Subscription>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Single owner of a client's state.
///
/// Commands and transport events are handled one at a time on this task, so the
/// subscription registry is never mutated concurrently.
pub(crate) struct ClientDriver {
    transport: Arc<dyn Transport>,
    inputs: mpsc::UnboundedReceiver<DriverInput>,
    weak_inputs: mpsc::WeakUnboundedSender<DriverInput>,
    state: ClientState,
}

impl ClientDriver {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        inputs: mpsc::UnboundedReceiver<DriverInput>,
        weak_inputs: mpsc::WeakUnboundedSender<DriverInput>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            transport,
            inputs,
            weak_inputs,
            state: ClientState::new(state_tx),
        }
    }

    /// Runs until every `RealtimeClient` handle is dropped
    pub(crate) async fn run(mut self) {
        tracing::debug!("Client driver started");
        while let Some(input) = self.inputs.recv().await {
            match input {
                DriverInput::Command(command) => self.handle_command(command),
                DriverInput::Transport { epoch, event } => self.handle_transport(epoch, event),
            }
        }

        if let Some(session) = self.state.session.take() {
            session.close();
        }
        tracing::debug!("Client driver finished");
    }

    fn handle_command(&mut self, command: Command) {
        // A caller that stopped waiting does not undo the operation.
        match command {
            Command::Start {
                endpoint,
                credentials,
                reply,
            } => {
                self.start(endpoint, credentials);
                let _ = reply.send(());
            }
            Command::Subscribe { channel, reply } => {
                self.subscribe(channel);
                let _ = reply.send(());
            }
            Command::Unsubscribe { channel, reply } => {
                let _ = reply.send(self.unsubscribe(&channel));
            }
            Command::OnEvent { listener, reply } => {
                self.state.dispatcher.add_event_listener(listener);
                let _ = reply.send(());
            }
            Command::OnError { listener, reply } => {
                self.state.dispatcher.add_error_listener(listener);
                let _ = reply.send(());
            }
            Command::Subscriptions { reply } => {
                let _ = reply.send(self.state.registry.snapshot());
            }
            Command::Stop { reply } => {
                tracing::info!("Stopping realtime client");
                self.close_session(None);
                let _ = reply.send(());
            }
        }
    }

    fn handle_transport(&mut self, epoch: u64, event: TransportEvent) {
        if !self.state.is_current(epoch) {
            tracing::debug!("Dropping {:?} from stale session {}", event, epoch);
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(error) if !error.is_fatal_to_session() => {
                self.state.dispatcher.emit_error(&error);
            }
            TransportEvent::Error(error) => self.close_session(Some(error)),
            TransportEvent::Closed(reason) => {
                let reason = reason.unwrap_or_else(|| "no reason given".to_string());
                self.close_session(Some(RealtimeError::Transport(format!(
                    "connection closed by peer: {}",
                    reason
                ))));
            }
        }
    }

    fn start(&mut self, endpoint: Url, credentials: Option<Arc<dyn CredentialProvider>>) {
        if self.state.connection.is_active() {
            tracing::debug!(
                "Start ignored, connection already {:?}",
                self.state.connection
            );
            return;
        }

        let epoch = self.state.next_epoch();
        self.state.credentials = credentials;
        self.state.set_connection(ConnectionState::Connecting);

        let events = SessionEvents::new(epoch, self.weak_inputs.clone());
        match self.transport.open(&endpoint, events) {
            Ok(handle) => self.state.session = Some(Session::new(epoch, handle)),
            Err(error) => {
                tracing::error!("Failed to open session to {}: {}", endpoint, error);
                self.close_session(Some(error));
            }
        }
    }

    fn on_open(&mut self) {
        if self.state.connection != ConnectionState::Connecting {
            tracing::warn!(
                "Ignoring open notification while {:?}",
                self.state.connection
            );
            return;
        }

        if let Some(provider) = self.state.credentials.clone() {
            self.state.set_connection(ConnectionState::Authenticating);
            let sent = auth::resolve(provider.as_ref())
                .and_then(|credential| self.send(&OutboundRequest::auth(credential)));
            if let Err(error) = sent {
                tracing::error!("Authentication failed: {}", error);
                self.close_session(Some(error));
                return;
            }
        }

        self.state.set_connection(ConnectionState::Ready);
        self.flush_pending();
    }

    /// Sends SUBSCRIBE for every pending channel, in request order
    fn flush_pending(&mut self) {
        let pending = self.state.registry.pending();
        if pending.is_empty() {
            return;
        }
        tracing::info!("Flushing {} pending subscription(s)", pending.len());

        for channel in pending {
            if let Err(error) = self.send(&OutboundRequest::subscribe(&channel)) {
                self.close_session(Some(error));
                return;
            }
            self.state.registry.mark_active(&channel);
        }
    }

    fn subscribe(&mut self, channel: Channel) {
        if !self.state.registry.insert(channel.clone()) {
            tracing::debug!("Already subscribed to {}", channel);
            return;
        }

        if self.state.connection != ConnectionState::Ready {
            tracing::debug!("Deferring subscription to {} until ready", channel);
            return;
        }

        tracing::info!("Subscribing to channel: {}", channel);
        match self.send(&OutboundRequest::subscribe(&channel)) {
            Ok(()) => self.state.registry.mark_active(&channel),
            Err(error) => self.close_session(Some(error)),
        }
    }

    fn unsubscribe(&mut self, channel: &Channel) -> Option<Subscription> {
        let mut subscription = self.state.registry.remove(channel)?;

        if subscription.is_active() && self.state.connection == ConnectionState::Ready {
            tracing::info!("Unsubscribing from channel: {}", channel);
            if let Err(error) = self.send(&OutboundRequest::unsubscribe(channel)) {
                self.close_session(Some(error));
            }
        } else {
            tracing::debug!("Dropped unsent subscription to {}", channel);
        }

        subscription.status = SubscriptionStatus::Cancelled;
        Some(subscription)
    }

    fn on_message(&mut self, text: &str) {
        if self.state.connection != ConnectionState::Ready {
            self.state.dispatcher.emit_error(&RealtimeError::Protocol(format!(
                "message received while {:?}, dropped",
                self.state.connection
            )));
            return;
        }

        match RealtimeEvent::parse(text) {
            Ok(event) => self.state.dispatcher.dispatch(&event),
            Err(error) => {
                tracing::error!("Failed to parse message: {}", error);
                self.state.dispatcher.emit_error(&error);
            }
        }
    }

    fn send(&self, request: &OutboundRequest) -> Result<()> {
        match &self.state.session {
            Some(session) => session.send(request),
            None => Err(RealtimeError::Transport("no open session".to_string())),
        }
    }

    /// Releases the session, demotes active subscriptions for replay and moves to `Closed`.
    /// `error` is reported to error listeners.
    fn close_session(&mut self, error: Option<RealtimeError>) {
        if let Some(session) = self.state.session.take() {
            session.close();
        }

        let demoted = self.state.registry.demote_active();
        if demoted > 0 {
            tracing::debug!("{} subscription(s) will be replayed on next start", demoted);
        }
        self.state.set_connection(ConnectionState::Closed);

        if let Some(error) = error {
            tracing::warn!("Connection error: {}", error);
            self.state.dispatcher.emit_error(&error);
        }
    }
}
