//! Discount code response models.

use std::string::ToString;

use jiff::Timestamp;
use salvo::{http::StatusError, oapi::ToSchema};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::discounts::models::{DiscountCode, DiscountStats};

use crate::extensions::*;

/// Parse an optional RFC 3339 timestamp from a request body.
pub(crate) fn parse_timestamp(
    value: Option<String>,
    message: &str,
) -> Result<Option<Timestamp>, StatusError> {
    value
        .map(|value| value.parse::<Timestamp>())
        .transpose()
        .or_400(message)
}

/// Discount Code Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DiscountCodeResponse {
    pub uuid: Uuid,

    pub code: String,

    pub kind: String,

    pub value: u64,

    pub min_purchase: u64,

    pub max_uses: Option<u64>,

    pub used_count: u64,

    pub starts_at: Option<String>,

    pub expires_at: Option<String>,

    pub active: bool,

    pub created_at: String,

    pub updated_at: String,
}

impl From<DiscountCode> for DiscountCodeResponse {
    fn from(discount: DiscountCode) -> Self {
        let rule = discount.rule;

        Self {
            uuid: discount.uuid.into_uuid(),
            code: discount.code,
            kind: rule.kind.to_string(),
            value: rule.value,
            min_purchase: rule.min_purchase,
            max_uses: rule.max_uses,
            used_count: rule.used_count,
            starts_at: rule.starts_at.as_ref().map(ToString::to_string),
            expires_at: rule.expires_at.as_ref().map(ToString::to_string),
            active: rule.active,
            created_at: discount.created_at.to_string(),
            updated_at: discount.updated_at.to_string(),
        }
    }
}

/// Discount Stats Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DiscountStatsResponse {
    pub discount: DiscountCodeResponse,

    /// Redeemable right now, ignoring the minimum purchase
    pub is_valid: bool,

    pub used_count: u64,

    /// Unlimited when absent
    pub remaining_uses: Option<u64>,

    /// Negative once expired; absent when the code never expires
    pub days_until_expiry: Option<i64>,
}

impl From<DiscountStats> for DiscountStatsResponse {
    fn from(stats: DiscountStats) -> Self {
        Self {
            discount: stats.discount.into(),
            is_valid: stats.is_valid,
            used_count: stats.used_count,
            remaining_uses: stats.remaining_uses,
            days_until_expiry: stats.days_until_expiry,
        }
    }
}
