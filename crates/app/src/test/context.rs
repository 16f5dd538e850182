//! Test context for service-level integration tests.

use std::{sync::Arc, time::Duration};

use crate::{
    database::Db,
    domain::{
        carts::{CartSettings, PgCartsService},
        catalog::PgCatalogService,
        discounts::PgDiscountsService,
        inventory::PgInventoryService,
        orders::{OrderSettings, PgOrdersService},
        reconciler::PgReconcilerService,
    },
    notifications::{NotificationEvent, Notifier},
    payments::mock::MockGateway,
};

use super::db::TestDb;

/// Keeps every event it is handed, for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: std::sync::Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: NotificationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

pub struct TestContext {
    pub db: TestDb,
    pub catalog: PgCatalogService,
    pub inventory: PgInventoryService,
    pub carts: PgCartsService,
    pub discounts: PgDiscountsService,
    pub orders: PgOrdersService,
    pub reconciler: PgReconcilerService,
    pub gateway: Arc<MockGateway>,
    pub notifications: Arc<RecordingNotifier>,
}

impl TestContext {
    pub async fn new() -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool().clone());

        let gateway = Arc::new(MockGateway::new(1, false));
        let notifications = Arc::new(RecordingNotifier::default());

        Self {
            catalog: PgCatalogService::new(db.clone()),
            inventory: PgInventoryService::new(db.clone()),
            carts: PgCartsService::new(db.clone(), CartSettings::default()),
            discounts: PgDiscountsService::new(db.clone()),
            orders: PgOrdersService::new(
                db.clone(),
                OrderSettings::default(),
                gateway.clone(),
                notifications.clone(),
            ),
            reconciler: PgReconcilerService::new(
                db,
                gateway.clone(),
                notifications.clone(),
                Duration::from_secs(5),
            ),
            gateway,
            notifications,
            db: test_db,
        }
    }
}
