// Module declarations
mod channel;
mod registry;
mod state;

// Public API exports
pub use channel::{Channel, IntoChannel};
pub use registry::SubscriptionRegistry;
pub use state::{Subscription, SubscriptionStatus};
