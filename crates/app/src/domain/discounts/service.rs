//! Discounts service.

use async_trait::async_trait;
use atelier::discounts::DiscountRule;
use jiff::Timestamp;
use mockall::automock;

use crate::{
    database::Db,
    domain::discounts::{
        errors::DiscountsServiceError,
        models::{
            DiscountCode, DiscountCodeUpdate, DiscountCodeUuid, DiscountFilter, DiscountPage,
            DiscountPreview, DiscountRemoval, DiscountStats, NewDiscountCode, normalize_code,
        },
        repository::PgDiscountsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgDiscountsService {
    db: Db,
    repository: PgDiscountsRepository,
}

impl PgDiscountsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgDiscountsRepository::new(),
        }
    }
}

/// A validity window must open before it closes.
fn check_window(
    starts_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
) -> Result<(), DiscountsServiceError> {
    if let (Some(starts_at), Some(expires_at)) = (starts_at, expires_at)
        && starts_at >= expires_at
    {
        return Err(DiscountsServiceError::InvalidData);
    }

    Ok(())
}

#[async_trait]
impl DiscountsService for PgDiscountsService {
    async fn find_by_code(&self, code: &str) -> Result<DiscountCode, DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let discount = self
            .repository
            .find_by_code(&mut tx, &normalize_code(code))
            .await?;

        tx.commit().await?;

        Ok(discount)
    }

    #[tracing::instrument(
        name = "discounts.service.create_discount_code",
        skip(self, discount),
        fields(discount_uuid = %discount.uuid, kind = %discount.kind),
        err
    )]
    async fn create_discount_code(
        &self,
        mut discount: NewDiscountCode,
    ) -> Result<DiscountCode, DiscountsServiceError> {
        DiscountRule::validate_value(discount.kind, discount.value)?;

        discount.code = normalize_code(&discount.code);

        if discount.code.is_empty() {
            return Err(DiscountsServiceError::MissingRequiredData);
        }

        check_window(discount.starts_at, discount.expires_at)?;

        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_discount_code(&mut tx, discount)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_discount_code(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountCode, DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let discount = self.repository.get_discount_code(&mut tx, discount).await?;

        tx.commit().await?;

        Ok(discount)
    }

    async fn list_discount_codes(
        &self,
        filter: DiscountFilter,
    ) -> Result<DiscountPage, DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let (discounts, total) = self
            .repository
            .list_discount_codes(&mut tx, &filter)
            .await?;

        tx.commit().await?;

        Ok(DiscountPage {
            discounts,
            total,
            page: filter.page(),
            per_page: filter.per_page(),
        })
    }

    #[tracing::instrument(
        name = "discounts.service.update_discount_code",
        skip(self, update),
        fields(discount_uuid = %discount),
        err
    )]
    async fn update_discount_code(
        &self,
        discount: DiscountCodeUuid,
        update: DiscountCodeUpdate,
    ) -> Result<DiscountCode, DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut current = self.repository.lock_discount_code(&mut tx, discount).await?;

        update.apply_to(&mut current);

        let rule = &current.rule;

        DiscountRule::validate_value(rule.kind, rule.value)?;

        if current.code.is_empty() {
            return Err(DiscountsServiceError::MissingRequiredData);
        }

        if rule.max_uses == Some(0) {
            return Err(DiscountsServiceError::InvalidData);
        }

        check_window(rule.starts_at, rule.expires_at)?;

        let updated = self
            .repository
            .update_discount_code(&mut tx, &current)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "discounts.service.delete_discount_code",
        skip(self),
        fields(discount_uuid = %discount),
        err
    )]
    async fn delete_discount_code(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountRemoval, DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut current = self.repository.lock_discount_code(&mut tx, discount).await?;

        let removal = if current.rule.used_count > 0 {
            DiscountCodeUpdate::deactivate().apply_to(&mut current);

            let kept = self
                .repository
                .update_discount_code(&mut tx, &current)
                .await?;

            tracing::info!(code = %kept.code, "redeemed code deactivated, not deleted");

            DiscountRemoval::Deactivated(kept)
        } else {
            self.repository
                .delete_discount_code(&mut tx, discount)
                .await?;

            DiscountRemoval::Deleted
        };

        tx.commit().await?;

        Ok(removal)
    }

    async fn discount_stats(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountStats, DiscountsServiceError> {
        let discount = self.get_discount_code(discount).await?;

        Ok(DiscountStats::at(discount, Timestamp::now()))
    }

    async fn preview(
        &self,
        code: &str,
        subtotal: u64,
    ) -> Result<DiscountPreview, DiscountsServiceError> {
        let discount = self.find_by_code(code).await?;

        let amount = discount.rule.amount_for(subtotal, Timestamp::now())?;

        if amount == 0 {
            return Err(DiscountsServiceError::NoDiscount);
        }

        Ok(DiscountPreview {
            code: discount.code,
            kind: discount.rule.kind,
            value: discount.rule.value,
            discount_amount: amount,
            subtotal,
            total_before: subtotal,
            total_after: subtotal - amount,
        })
    }

    #[tracing::instrument(name = "discounts.service.record_usage", skip(self), err)]
    async fn record_usage(&self, discount: DiscountCodeUuid) -> Result<(), DiscountsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.record_usage(&mut tx, discount).await?;

        if rows_affected == 0 {
            return Err(DiscountsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait DiscountsService: Send + Sync {
    /// Look up a code, case-insensitively.
    async fn find_by_code(&self, code: &str) -> Result<DiscountCode, DiscountsServiceError>;

    /// Create a discount code.
    async fn create_discount_code(
        &self,
        discount: NewDiscountCode,
    ) -> Result<DiscountCode, DiscountsServiceError>;

    /// Retrieve a code by uuid.
    async fn get_discount_code(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountCode, DiscountsServiceError>;

    /// List codes, newest first.
    async fn list_discount_codes(
        &self,
        filter: DiscountFilter,
    ) -> Result<DiscountPage, DiscountsServiceError>;

    /// Change some fields of a code, deactivation included.
    async fn update_discount_code(
        &self,
        discount: DiscountCodeUuid,
        update: DiscountCodeUpdate,
    ) -> Result<DiscountCode, DiscountsServiceError>;

    /// Delete a code that was never redeemed; a redeemed one is deactivated instead.
    async fn delete_discount_code(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountRemoval, DiscountsServiceError>;

    /// Usage and validity figures for a code.
    async fn discount_stats(
        &self,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountStats, DiscountsServiceError>;

    /// Price a code against a subtotal without redeeming it.
    async fn preview(
        &self,
        code: &str,
        subtotal: u64,
    ) -> Result<DiscountPreview, DiscountsServiceError>;

    /// Count one redemption of a code.
    async fn record_usage(&self, discount: DiscountCodeUuid) -> Result<(), DiscountsServiceError>;
}
