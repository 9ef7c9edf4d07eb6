use super::Channel;

/// Lifecycle of one channel's subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Requested, SUBSCRIBE not sent on the current session yet
    Pending,
    /// SUBSCRIBE enqueued to the transport on the current session
    Active,
    /// Removed by the caller
    Cancelled,
}

/// Interest in one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel: Channel,
    pub status: SubscriptionStatus,
}

impl Subscription {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            status: SubscriptionStatus::Pending,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}
