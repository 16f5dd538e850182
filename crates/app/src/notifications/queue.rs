//! Notification Queue

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::notifications::{NotificationEvent, NotificationSink, Notifier};

/// Attempts per sink before an event is given up on.
pub const DELIVERY_ATTEMPTS: u32 = 3;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Bounded queue in front of the notification sinks.
///
/// Events are dropped with a warning when the queue is full.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<NotificationEvent>,
}

impl NotificationQueue {
    /// Start the delivery worker. It drains queued events and stops once `shutdown` fires.
    #[must_use]
    pub fn start(
        capacity: usize,
        sinks: Vec<Arc<dyn NotificationSink>>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let worker = tokio::spawn(run(receiver, sinks, shutdown));

        (Self { sender }, worker)
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(kind = event.kind(), "notification queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::debug!(kind = event.kind(), "notification queue closed");
            }
        }
    }
}

async fn run(
    mut receiver: mpsc::Receiver<NotificationEvent>,
    sinks: Vec<Arc<dyn NotificationSink>>,
    shutdown: CancellationToken,
) {
    tracing::info!(sinks = sinks.len(), "notification worker started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                receiver.close();

                while let Some(event) = receiver.recv().await {
                    dispatch(&sinks, &event).await;
                }

                break;
            }
            event = receiver.recv() => {
                let Some(event) = event else {
                    break;
                };

                dispatch(&sinks, &event).await;
            }
        }
    }

    tracing::info!("notification worker stopped");
}

async fn dispatch(sinks: &[Arc<dyn NotificationSink>], event: &NotificationEvent) {
    for sink in sinks {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 1..=DELIVERY_ATTEMPTS {
            match sink.deliver(event).await {
                Ok(()) => break,
                Err(error) if attempt < DELIVERY_ATTEMPTS => {
                    tracing::debug!(
                        sink = sink.name(),
                        kind = event.kind(),
                        attempt,
                        error = %error,
                        "notification delivery failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(error) => {
                    tracing::error!(
                        sink = sink.name(),
                        kind = event.kind(),
                        error = %error,
                        "notification delivery abandoned"
                    );
                }
            }
        }
    }
}
