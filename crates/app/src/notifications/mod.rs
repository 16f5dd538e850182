//! Notifications
//!
//! Structured events fanned out to delivery sinks by a bounded background queue, so the request
//! path never waits on delivery.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub mod events;
pub mod queue;
pub mod sinks;

pub use events::{NotificationEvent, Severity};
pub use queue::NotificationQueue;
pub use sinks::{PgNotificationSink, TracingSink};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A destination for notification events: the log, the admin inbox, a marketplace sync.
#[automock]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError>;
}

/// Accepts events without blocking the caller.
#[automock]
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}
