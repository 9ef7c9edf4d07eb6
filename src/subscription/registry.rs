use super::{Channel, Subscription, SubscriptionStatus};

/// Channel subscriptions in the order they were first requested.
///
/// Keyed by [`Channel::key`]; requesting the same channel twice reuses the
/// existing entry and keeps its original position.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending entry. Returns `false` if the channel was already registered.
    pub fn insert(&mut self, channel: Channel) -> bool {
        if self.position(&channel).is_some() {
            return false;
        }
        self.entries.push(Subscription::new(channel));
        true
    }

    /// Removes the entry for `channel`, returning it with its last status
    pub fn remove(&mut self, channel: &Channel) -> Option<Subscription> {
        let index = self.position(channel)?;
        Some(self.entries.remove(index))
    }

    pub fn mark_active(&mut self, channel: &Channel) {
        if let Some(index) = self.position(channel) {
            self.entries[index].status = SubscriptionStatus::Active;
        }
    }

    /// Pending channels, in request order
    pub fn pending(&self) -> Vec<Channel> {
        self.entries
            .iter()
            .filter(|sub| sub.status == SubscriptionStatus::Pending)
            .map(|sub| sub.channel.clone())
            .collect()
    }

    /// Moves every active entry back to pending so it is replayed on the next session.
    /// Returns how many entries were demoted.
    pub fn demote_active(&mut self) -> usize {
        let mut demoted = 0;
        for sub in self.entries.iter_mut().filter(|sub| sub.is_active()) {
            sub.status = SubscriptionStatus::Pending;
            demoted += 1;
        }
        demoted
    }

    pub fn snapshot(&self) -> Vec<Subscription> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, channel: &Channel) -> Option<usize> {
        self.entries.iter().position(|sub| sub.channel == *channel)
    }
}
