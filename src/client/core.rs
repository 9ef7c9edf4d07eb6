use super::driver::{Command, DriverInput};
use super::{ConnectionState, RealtimeClientBuilder, RealtimeClientOptions};
use crate::auth::CredentialProvider;
use crate::messaging::{ErrorListener, EventListener, RealtimeEvent, channel_listener};
use crate::subscription::{IntoChannel, Subscription};
use crate::types::{RealtimeError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

/// The main entry point: one persistent realtime session and its channel subscriptions.
///
/// `RealtimeClient` is a cheap, cloneable handle. All clones talk to the same
/// background driver task, which owns the connection, authenticates, keeps the
/// subscription registry and delivers inbound events to listeners. Operations
/// from any number of tasks are applied one at a time in the order they arrive.
///
/// The client never reconnects by itself: when the session closes, call
/// [`start()`](Self::start) again and every registered channel is re-subscribed.
///
/// # Example
///
/// ```no_run
/// use cozy_realtime_rs::{RealtimeClient, RealtimeClientOptions, StaticCredential};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RealtimeClient::new(RealtimeClientOptions::default())?;
///
/// client
///     .on_event(|event| println!("{}", event.body()))
///     .await?;
/// client.subscribe("io.cozy.files").await?;
/// client
///     .start_with_credentials("ws://cozy.tools:8080/realtime/", StaticCredential::new("token"))
///     .await?;
/// // ...
/// client.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) inputs: mpsc::UnboundedSender<DriverInput>,
    pub(crate) state: watch::Receiver<ConnectionState>,
}

impl RealtimeClient {
    /// Creates a client using the WebSocket transport.
    ///
    /// No connection is made until [`start()`](Self::start) is called. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidArgument`] if the options are invalid.
    pub fn new(options: RealtimeClientOptions) -> Result<Self> {
        RealtimeClientBuilder::new(options).map(|builder| builder.build())
    }

    /// Opens the session without an authentication step.
    ///
    /// Returns once the attempt is underway; the state moves to
    /// [`ConnectionState::Connecting`], then to [`ConnectionState::Ready`] when the
    /// transport reports the session open. Failures are reported to error
    /// listeners and end in [`ConnectionState::Closed`]. Calling `start` while a
    /// session is already underway does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidArgument`] or [`RealtimeError::UrlParse`]
    /// if `endpoint` is not a `ws://` or `wss://` URL; the state is unchanged.
    pub async fn start(&self, endpoint: &str) -> Result<()> {
        self.start_inner(endpoint, None).await
    }

    /// Opens the session and authenticates with a credential from `provider`.
    ///
    /// The provider is queried when the transport reports the session open, not
    /// now, and the AUTH request is the first thing sent on the session.
    pub async fn start_with_credentials(
        &self,
        endpoint: &str,
        provider: impl CredentialProvider,
    ) -> Result<()> {
        let provider: Arc<dyn CredentialProvider> = Arc::new(provider);
        self.start_inner(endpoint, Some(provider)).await
    }

    async fn start_inner(
        &self,
        endpoint: &str,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Result<()> {
        let endpoint = parse_endpoint(endpoint)?;
        self.request(|reply| Command::Start {
            endpoint,
            credentials,
            reply,
        })
        .await
    }

    /// Registers interest in a channel.
    ///
    /// When the session is ready the SUBSCRIBE request is sent right away;
    /// otherwise it is sent when the session next becomes ready. Subscribing to
    /// an already registered channel does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidArgument`] for an empty or malformed channel id.
    pub async fn subscribe(&self, channel: impl IntoChannel) -> Result<()> {
        let channel = channel.into_channel()?;
        self.request(|reply| Command::Subscribe { channel, reply })
            .await
    }

    /// Removes interest in a channel.
    ///
    /// UNSUBSCRIBE is only sent if SUBSCRIBE was sent on the current session.
    /// Returns the removed subscription (status `Cancelled`), or `None` if the
    /// channel was not registered.
    pub async fn unsubscribe(&self, channel: impl IntoChannel) -> Result<Option<Subscription>> {
        let channel = channel.into_channel()?;
        self.request(|reply| Command::Unsubscribe { channel, reply })
            .await
    }

    /// Registers a callback invoked for every inbound event, whatever channel produced it.
    ///
    /// Callbacks run in registration order on the client's driver task and
    /// should return quickly.
    pub async fn on_event<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let listener: EventListener = Arc::new(listener);
        self.request(|reply| Command::OnEvent { listener, reply })
            .await
    }

    /// Registers a callback for connection and protocol errors
    pub async fn on_error<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(&RealtimeError) + Send + Sync + 'static,
    {
        let listener: ErrorListener = Arc::new(listener);
        self.request(|reply| Command::OnError { listener, reply })
            .await
    }

    /// Returns a stream of every inbound event.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use cozy_realtime_rs::RealtimeClient;
    /// # async fn example(client: RealtimeClient) -> Result<(), Box<dyn std::error::Error>> {
    /// let mut events = client.events().await?;
    /// tokio::spawn(async move {
    ///     while let Some(event) = events.recv().await {
    ///         println!("{:?} {:?}", event.kind(), event.doctype());
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub async fn events(&self) -> Result<mpsc::UnboundedReceiver<RealtimeEvent>> {
        let (listener, rx) = channel_listener();
        self.request(|reply| Command::OnEvent { listener, reply })
            .await?;
        Ok(rx)
    }

    /// Registered subscriptions, in request order
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        self.request(|reply| Command::Subscriptions { reply }).await
    }

    /// Closes the session and moves to [`ConnectionState::Closed`].
    ///
    /// Subscriptions are kept and replayed by the next [`start()`](Self::start).
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Watch channel for state transitions (holds the latest state only)
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inputs
            .send(DriverInput::Command(make(reply_tx)))
            .map_err(|_| RealtimeError::ClientClosed)?;
        reply_rx.await.map_err(|_| RealtimeError::ClientClosed)
    }
}

/// Parses and checks a `ws://` or `wss://` endpoint
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(RealtimeError::InvalidArgument(format!(
            "endpoint scheme must be ws or wss, got '{}'",
            other
        ))),
    }
}
