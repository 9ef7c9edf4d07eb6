use super::connection::{ConnectionState, Session};
use crate::auth::CredentialProvider;
use crate::messaging::EventDispatcher;
use crate::subscription::SubscriptionRegistry;
use std::sync::Arc;
use tokio::sync::watch;

/// Mutable state of one client, owned by its driver task
pub(crate) struct ClientState {
    /// Current lifecycle state
    pub connection: ConnectionState,

    /// Live transport session, if any
    pub session: Option<Session>,

    /// Tag of the most recently opened session
    pub epoch: u64,

    /// Credential source for the current start, `None` when unauthenticated
    pub credentials: Option<Arc<dyn CredentialProvider>>,

    /// Channels the caller wants, in request order
    pub registry: SubscriptionRegistry,

    /// Event and error listeners
    pub dispatcher: EventDispatcher,

    /// Publishes state transitions to `RealtimeClient::state_changes`
    state_tx: watch::Sender<ConnectionState>,
}

impl ClientState {
    pub fn new(state_tx: watch::Sender<ConnectionState>) -> Self {
        Self {
            connection: ConnectionState::Idle,
            session: None,
            epoch: 0,
            credentials: None,
            registry: SubscriptionRegistry::new(),
            dispatcher: EventDispatcher::new(),
            state_tx,
        }
    }

    /// Generate the tag for a new session
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Whether `epoch` names the live session
    pub fn is_current(&self, epoch: u64) -> bool {
        self.session.as_ref().map(Session::epoch) == Some(epoch)
    }

    /// Record a transition and notify watchers
    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection == state {
            return;
        }
        tracing::info!("Connection state {:?} -> {:?}", self.connection, state);
        self.connection = state;
        self.state_tx.send_replace(state);
    }
}
