//! Maintenance Jobs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    domain::carts::CartsService,
    scheduler::{Job, JobError},
};

pub const CART_EXPIRY_SWEEP: &str = "cart-expiry-sweep";

/// Deletes carts whose expiry has passed.
pub struct CartExpirySweep {
    carts: Arc<dyn CartsService>,
    interval: Duration,
}

impl CartExpirySweep {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsService>, interval: Duration) -> Self {
        Self { carts, interval }
    }
}

#[async_trait]
impl Job for CartExpirySweep {
    fn name(&self) -> &'static str {
        CART_EXPIRY_SWEEP
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> Result<String, JobError> {
        let deleted = self
            .carts
            .delete_expired_carts(Timestamp::now())
            .await
            .map_err(|error| JobError::Failed(error.to_string()))?;

        Ok(format!("deleted {deleted} expired carts"))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::carts::{CartsServiceError, MockCartsService};

    use super::*;

    #[tokio::test]
    async fn sweep_reports_deleted_carts() -> TestResult {
        let mut carts = MockCartsService::new();

        carts
            .expect_delete_expired_carts()
            .once()
            .returning(|_| Ok(3));

        let job = CartExpirySweep::new(Arc::new(carts), Duration::from_secs(3_600));

        assert_eq!(job.name(), "cart-expiry-sweep");
        assert_eq!(job.run().await?, "deleted 3 expired carts");

        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_fails_the_run() {
        let mut carts = MockCartsService::new();

        carts
            .expect_delete_expired_carts()
            .returning(|_| Err(CartsServiceError::InvalidData));

        let job = CartExpirySweep::new(Arc::new(carts), Duration::from_secs(3_600));

        assert_eq!(
            job.run().await,
            Err(JobError::Failed("invalid data".to_string()))
        );
    }
}
