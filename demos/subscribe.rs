use cozy_realtime_rs::{
    Backoff, ConnectionState, EnvCredential, RealtimeClient, RealtimeClientOptions,
};

/// Subscribes to the channels given on the command line and prints every event.
///
/// Environment:
/// - `REALTIME_URL`   endpoint, default `ws://cozy.tools:8080/realtime/`
/// - `REALTIME_TOKEN` credential; when unset no AUTH is sent
/// - `REALTIME_PROTOCOL`, `REALTIME_TIMEOUT_MS`, `REALTIME_HEARTBEAT_MS`
///
/// ```text
/// cargo run --example subscribe -- io.cozy.files io.cozy.notes
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url = std::env::var("REALTIME_URL")
        .unwrap_or_else(|_| "ws://cozy.tools:8080/realtime/".to_string());
    let authenticated = std::env::var("REALTIME_TOKEN").is_ok();
    let mut channels: Vec<String> = std::env::args().skip(1).collect();
    if channels.is_empty() {
        channels.push("io.cozy.files".to_string());
    }

    let client = RealtimeClient::new(RealtimeClientOptions::from_env()?)?;

    client
        .on_event(|event| match (event.kind(), event.doctype()) {
            (Some(kind), Some(doctype)) => println!(
                "{} {} {}",
                kind,
                doctype,
                event.doc_id().unwrap_or("-")
            ),
            _ => println!("{}", event.body()),
        })
        .await?;
    client
        .on_error(|error| eprintln!("realtime error: {}", error))
        .await?;

    for channel in &channels {
        client.subscribe(channel).await?;
    }

    let mut states = client.state_changes();
    let mut backoff = Backoff::default();

    println!("Connecting to {} (auth: {})", url, authenticated);
    start(&client, &url, authenticated).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Ready => {
                        backoff.reset();
                        println!("Ready, subscribed to {}", channels.join(", "));
                    }
                    ConnectionState::Closed => {
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => break,
                            _ = backoff.wait() => {}
                        }
                        println!("Reconnecting (attempt {})", backoff.attempts());
                        start(&client, &url, authenticated).await?;
                    }
                    _ => {}
                }
            }
        }
    }

    println!("Stopping...");
    client.stop().await?;
    Ok(())
}

async fn start(
    client: &RealtimeClient,
    url: &str,
    authenticated: bool,
) -> cozy_realtime_rs::Result<()> {
    if authenticated {
        client
            .start_with_credentials(url, EnvCredential::new("REALTIME_TOKEN"))
            .await
    } else {
        client.start(url).await
    }
}
