use super::*;
use crate::subscription::{Channel, SubscriptionStatus};
use crate::transport::memory::MemoryTransport;
use crate::types::{RealtimeError, Result};
use std::sync::{Arc, Mutex};

const ENDPOINT: &str = "ws://cozy.tools:8080/realtime/";

const SUB_FILES: &str = r#"{"method":"SUBSCRIBE","payload":{"type":"io.cozy.files"}}"#;

fn subscribe_json(doctype: &str) -> String {
    format!(r#"{{"method":"SUBSCRIBE","payload":{{"type":"{}"}}}}"#, doctype)
}

fn unsubscribe_json(doctype: &str) -> String {
    format!(r#"{{"method":"UNSUBSCRIBE","payload":{{"type":"{}"}}}}"#, doctype)
}

fn client_with(transport: &MemoryTransport) -> RealtimeClient {
    RealtimeClientBuilder::new(RealtimeClientOptions::default())
        .unwrap()
        .transport(transport.clone())
        .build()
}

/// Round-trips through the driver so every input queued before it is processed
async fn settle(client: &RealtimeClient) {
    client.subscriptions().await.unwrap();
}

async fn ready_client(transport: &MemoryTransport) -> RealtimeClient {
    let client = client_with(transport);
    client.start(ENDPOINT).await.unwrap();
    transport.session().opened();
    settle(&client).await;
    assert_eq!(client.state(), ConnectionState::Ready);
    client
}

async fn record_errors(client: &RealtimeClient) -> Arc<Mutex<Vec<String>>> {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = Arc::clone(&errors);
    client
        .on_error(move |error: &RealtimeError| errors_clone.lock().unwrap().push(error.to_string()))
        .await
        .unwrap();
    errors
}

#[tokio::test]
async fn test_subscribe_while_ready_without_auth() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    assert!(transport.sent().is_empty());

    client.subscribe("io.cozy.files").await.unwrap();

    assert_eq!(transport.sent(), vec![SUB_FILES.to_string()]);
    assert_eq!(transport.endpoints()[0].as_str(), ENDPOINT);
}

#[tokio::test]
async fn test_auth_is_first_message_after_open() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    client.subscribe("io.cozy.files").await.unwrap();

    // The provider runs while the driver is authenticating; record what it sees.
    let seen: Arc<Mutex<Vec<ConnectionState>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let states = client.state_changes();
    client
        .start_with_credentials(ENDPOINT, move || -> Result<String> {
            seen_clone.lock().unwrap().push(*states.borrow());
            Ok("tok123".to_string())
        })
        .await
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Connecting);
    assert!(transport.sent().is_empty());

    transport.session().opened();
    settle(&client).await;

    assert_eq!(*seen.lock().unwrap(), vec![ConnectionState::Authenticating]);
    assert_eq!(
        transport.sent(),
        vec![
            r#"{"method":"AUTH","payload":"tok123"}"#.to_string(),
            SUB_FILES.to_string(),
        ]
    );
    assert!(client.is_ready());
}

#[tokio::test]
async fn test_credential_is_read_when_session_opens() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    let token: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let source = Arc::clone(&token);
    client
        .start_with_credentials(ENDPOINT, move || -> Result<String> {
            source
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| RealtimeError::Auth("token not rendered yet".to_string()))
        })
        .await
        .unwrap();

    // Only available after start.
    *token.lock().unwrap() = Some("late-token".to_string());
    transport.session().opened();
    settle(&client).await;

    assert_eq!(
        transport.sent(),
        vec![r#"{"method":"AUTH","payload":"late-token"}"#.to_string()]
    );
}

#[tokio::test]
async fn test_credential_failure_closes_session() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    let errors = record_errors(&client).await;
    client.subscribe("io.cozy.files").await.unwrap();

    client
        .start_with_credentials(ENDPOINT, || -> Result<String> { Ok(String::new()) })
        .await
        .unwrap();
    transport.session().opened();
    settle(&client).await;

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(transport.sent().is_empty());
    assert_eq!(transport.close_count(), 1);
    assert!(errors.lock().unwrap()[0].starts_with("Authentication error"));
}

#[tokio::test]
async fn test_subscribe_then_unsubscribe_before_ready_sends_nothing() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);

    client.subscribe("io.cozy.files").await.unwrap();
    client.start(ENDPOINT).await.unwrap();
    let removed = client.unsubscribe("io.cozy.files").await.unwrap().unwrap();
    assert_eq!(removed.status, SubscriptionStatus::Cancelled);

    transport.session().opened();
    settle(&client).await;

    assert!(client.is_ready());
    assert!(transport.sent().is_empty());
    assert!(client.subscriptions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_subscribe_sends_once() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    client.subscribe("a").await.unwrap();
    client.subscribe("a").await.unwrap();

    assert_eq!(transport.sent(), vec![subscribe_json("a")]);
    assert_eq!(client.subscriptions().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_same_channel() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    let mut handles = vec![];
    for _ in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.subscribe("io.cozy.files").await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(transport.sent(), vec![SUB_FILES.to_string()]);
}

#[tokio::test]
async fn test_reconnect_replays_in_request_order() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let errors = record_errors(&client).await;

    client.subscribe("a").await.unwrap();
    client.subscribe("b").await.unwrap();
    transport.take_sent();

    transport.session().closed(Some("going away".to_string()));
    settle(&client).await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(errors.lock().unwrap()[0].contains("going away"));

    let subs = client.subscriptions().await.unwrap();
    assert!(subs.iter().all(|s| s.status == SubscriptionStatus::Pending));

    client.subscribe("c").await.unwrap();
    client.start(ENDPOINT).await.unwrap();
    transport.session().opened();
    settle(&client).await;

    assert_eq!(
        transport.sent(),
        vec![subscribe_json("a"), subscribe_json("b"), subscribe_json("c")]
    );
    let subs = client.subscriptions().await.unwrap();
    assert!(subs.iter().all(|s| s.is_active()));
}

#[tokio::test]
async fn test_stop_keeps_subscriptions_for_next_start() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    client.subscribe("io.cozy.files").await.unwrap();

    client.stop().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(transport.close_count(), 1);
    assert_eq!(
        client.subscriptions().await.unwrap()[0].status,
        SubscriptionStatus::Pending
    );

    transport.take_sent();
    client.start(ENDPOINT).await.unwrap();
    transport.session().opened();
    settle(&client).await;

    assert_eq!(transport.open_count(), 2);
    assert_eq!(transport.sent(), vec![SUB_FILES.to_string()]);
}

#[tokio::test]
async fn test_stop_while_connecting_releases_session() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    client.start(ENDPOINT).await.unwrap();
    let stale = transport.session();

    client.stop().await.unwrap();
    assert_eq!(transport.close_count(), 1);

    // A late open from the released session must not revive it.
    stale.opened();
    settle(&client).await;
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_events_from_stale_session_are_ignored() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let stale = transport.session();
    client.stop().await.unwrap();

    client.start(ENDPOINT).await.unwrap();
    transport.session().opened();
    let mut events = client.events().await.unwrap();

    stale.message(r#"{"event":"CREATED"}"#);
    stale.closed(None);
    transport.session().message(r#"{"event":"UPDATED"}"#);
    settle(&client).await;

    assert!(client.is_ready());
    let event = events.recv().await.unwrap();
    assert_eq!(event.kind().unwrap().as_str(), "UPDATED");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribe_active_channel_sends_request() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    client.subscribe("io.cozy.files").await.unwrap();

    let removed = client.unsubscribe("io.cozy.files").await.unwrap().unwrap();

    assert_eq!(removed.channel, Channel::new("io.cozy.files").unwrap());
    assert_eq!(removed.status, SubscriptionStatus::Cancelled);
    assert_eq!(
        transport.sent(),
        vec![SUB_FILES.to_string(), unsubscribe_json("io.cozy.files")]
    );
}

#[tokio::test]
async fn test_unsubscribe_unknown_channel_is_noop() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    assert!(client.unsubscribe("io.cozy.unknown").await.unwrap().is_none());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_channel_is_rejected() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    assert!(matches!(
        client.subscribe("").await,
        Err(RealtimeError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.unsubscribe("bad channel").await,
        Err(RealtimeError::InvalidArgument(_))
    ));
    assert!(client.subscriptions().await.unwrap().is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_endpoint_leaves_client_idle() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);

    assert!(matches!(
        client.start("http://cozy.tools/realtime/").await,
        Err(RealtimeError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.start("not a url").await,
        Err(RealtimeError::UrlParse(_))
    ));
    assert_eq!(client.state(), ConnectionState::Idle);
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_document_channel_subscription() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    client
        .subscribe(Channel::document("io.cozy.files", "f00d").unwrap())
        .await
        .unwrap();

    assert_eq!(
        transport.sent(),
        vec![r#"{"method":"SUBSCRIBE","payload":{"type":"io.cozy.files","id":"f00d"}}"#.to_string()]
    );
}

#[tokio::test]
async fn test_listeners_receive_events_in_registration_order() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let calls = Arc::new(Mutex::new(Vec::new()));

    for name in ["log", "counter"] {
        let calls = Arc::clone(&calls);
        client
            .on_event(move |event| {
                let doctype = event.doctype().unwrap_or_default().to_string();
                calls.lock().unwrap().push(format!("{}:{}", name, doctype));
            })
            .await
            .unwrap();
    }

    transport
        .session()
        .message(r#"{"event":"CREATED","payload":{"type":"io.cozy.files","id":"1"}}"#);
    transport
        .session()
        .message(r#"{"event":"DELETED","payload":{"type":"io.cozy.notes","id":"2"}}"#);
    settle(&client).await;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "log:io.cozy.files",
            "counter:io.cozy.files",
            "log:io.cozy.notes",
            "counter:io.cozy.notes",
        ]
    );
}

#[tokio::test]
async fn test_malformed_message_is_dropped_and_reported() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let errors = record_errors(&client).await;
    let mut events = client.events().await.unwrap();

    transport.session().message("<html>not json</html>");
    transport.session().message(r#"{"event":"CREATED"}"#);
    settle(&client).await;

    assert!(client.is_ready());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert!(errors.lock().unwrap()[0].starts_with("Protocol error"));
    assert_eq!(
        events.recv().await.unwrap().kind().unwrap().as_str(),
        "CREATED"
    );
}

#[tokio::test]
async fn test_protocol_error_from_transport_keeps_session() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let errors = record_errors(&client).await;

    transport
        .session()
        .error(RealtimeError::Protocol("unexpected binary message".to_string()));
    settle(&client).await;

    assert!(client.is_ready());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(transport.close_count(), 0);
}

#[tokio::test]
async fn test_transport_error_closes_and_demotes() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let errors = record_errors(&client).await;
    client.subscribe("a").await.unwrap();

    transport.session().error(RealtimeError::Timeout);
    settle(&client).await;

    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(transport.close_count(), 1);
    assert_eq!(*errors.lock().unwrap(), vec!["Timeout error".to_string()]);
    assert_eq!(
        client.subscriptions().await.unwrap()[0].status,
        SubscriptionStatus::Pending
    );
}

#[tokio::test]
async fn test_send_failure_closes_session() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let errors = record_errors(&client).await;

    transport.fail_send(true);
    client.subscribe("a").await.unwrap();

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(errors.lock().unwrap()[0].contains("broken pipe"));
    let subs = client.subscriptions().await.unwrap();
    assert_eq!(subs[0].status, SubscriptionStatus::Pending);

    transport.fail_send(false);
    client.start(ENDPOINT).await.unwrap();
    transport.session().opened();
    settle(&client).await;
    assert_eq!(transport.sent(), vec![subscribe_json("a")]);
}

#[tokio::test]
async fn test_open_failure_moves_to_closed() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    let errors = record_errors(&client).await;
    transport.fail_open(true);

    client.start(ENDPOINT).await.unwrap();

    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(errors.lock().unwrap()[0].contains("connection refused"));
}

#[tokio::test]
async fn test_start_while_active_is_noop() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;

    client.start(ENDPOINT).await.unwrap();

    assert_eq!(transport.open_count(), 1);
    assert!(client.is_ready());
}

#[tokio::test]
async fn test_message_before_ready_is_reported() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    let errors = record_errors(&client).await;
    client.start(ENDPOINT).await.unwrap();

    transport.session().message(r#"{"event":"CREATED"}"#);
    settle(&client).await;

    assert_eq!(client.state(), ConnectionState::Connecting);
    assert!(errors.lock().unwrap()[0].starts_with("Protocol error"));
}

#[tokio::test]
async fn test_state_changes_are_published() {
    let transport = MemoryTransport::new();
    let client = client_with(&transport);
    let mut states = client.state_changes();
    assert_eq!(*states.borrow_and_update(), ConnectionState::Idle);

    client.start(ENDPOINT).await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), ConnectionState::Connecting);

    transport.session().opened();
    settle(&client).await;
    assert_eq!(*states.borrow_and_update(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_dropping_last_client_releases_session() {
    let transport = MemoryTransport::new();
    let client = ready_client(&transport).await;
    let session = transport.session();

    drop(client);
    for _ in 0..100 {
        if transport.close_count() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(transport.close_count(), 1);
    assert!(!session.opened());
}
