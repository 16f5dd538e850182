//! Processed Webhook Events Repository

use sqlx::{Postgres, Transaction, query};

const RECORD_WEBHOOK_EVENT_SQL: &str = include_str!("sql/record_webhook_event.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgWebhookEventsRepository;

impl PgWebhookEventsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Remember a delivery. Returns `false` if it was already recorded.
    pub(crate) async fn record_event(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: &str,
        event_type: &str,
        intent_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(RECORD_WEBHOOK_EVENT_SQL)
            .bind(event_id)
            .bind(event_type)
            .bind(intent_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected == 1)
    }
}
