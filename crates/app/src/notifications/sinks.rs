//! Notification Sinks

use async_trait::async_trait;
use sqlx::{query, types::Json};
use uuid::Uuid;

use crate::{
    database::Db,
    notifications::{NotificationError, NotificationSink, events::NotificationEvent},
};

const CREATE_NOTIFICATION_SQL: &str = include_str!("sql/create_notification.sql");

/// Writes every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        tracing::info!(
            kind = event.kind(),
            severity = event.severity().as_str(),
            title = %event.title(),
            "{}",
            event.message()
        );

        Ok(())
    }
}

/// Stores events in the `notifications` table for the admin inbox.
#[derive(Debug, Clone)]
pub struct PgNotificationSink {
    db: Db,
}

impl PgNotificationSink {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        query(CREATE_NOTIFICATION_SQL)
            .bind(Uuid::now_v7())
            .bind(event.kind())
            .bind(event.severity().as_str())
            .bind(event.title())
            .bind(event.message())
            .bind(Json(event))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}
