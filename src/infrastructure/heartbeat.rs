use std::time::Duration;
use tokio::time::{self, Instant, Interval};

/// What the session should do on a heartbeat tick
#[derive(Debug, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a Ping frame carrying this payload
    Ping(Vec<u8>),
    /// The previous Ping was never answered
    TimedOut,
}

/// Ping-based liveness check for one session.
///
/// Each interval a Ping is due; if the Pong for the previous one has not
/// arrived by then, the session is considered dead.
pub struct Heartbeat {
    timer: Option<Interval>,
    pending: Option<u64>,
    counter: u64,
}

impl Heartbeat {
    pub fn new(interval: Option<Duration>) -> Self {
        let timer = interval.map(|period| {
            let mut timer = time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            timer
        });
        Self {
            timer,
            pending: None,
            counter: 0,
        }
    }

    /// Waits for the next tick. Never resolves when the heartbeat is disabled.
    pub async fn tick(&mut self) -> HeartbeatTick {
        let Some(timer) = self.timer.as_mut() else {
            return std::future::pending().await;
        };
        timer.tick().await;

        if let Some(pending) = self.pending {
            tracing::warn!("[Heartbeat] Ping {} unanswered, session timed out", pending);
            return HeartbeatTick::TimedOut;
        }

        self.counter += 1;
        self.pending = Some(self.counter);
        tracing::debug!("Sending heartbeat ping {}", self.counter);
        HeartbeatTick::Ping(self.counter.to_be_bytes().to_vec())
    }

    /// Clears the pending ping when its Pong arrives
    pub fn ack(&mut self, payload: &[u8]) {
        let Some(pending) = self.pending else {
            return;
        };
        if payload == pending.to_be_bytes().as_slice() {
            self.pending = None;
            tracing::debug!("Received heartbeat pong {}", pending);
        } else {
            tracing::debug!("Ignoring pong with unknown payload ({} bytes)", payload.len());
        }
    }
}
