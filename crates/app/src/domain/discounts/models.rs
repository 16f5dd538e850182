//! Discount Models

use atelier::discounts::{DiscountKind, DiscountRule};
use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::orders::models::{DEFAULT_PER_PAGE, MAX_PER_PAGE},
    uuids::TypedUuid,
};

/// Discount Code UUID
pub type DiscountCodeUuid = TypedUuid<DiscountCode>;

/// Discount Code Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountCode {
    pub uuid: DiscountCodeUuid,
    pub code: String,
    pub rule: DiscountRule,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Discount Code Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscountCode {
    pub uuid: DiscountCodeUuid,
    pub code: String,
    pub kind: DiscountKind,
    pub value: u64,
    pub min_purchase: u64,
    pub max_uses: Option<u64>,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub active: bool,
}

/// What a code would take off a subtotal, without redeeming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountPreview {
    pub code: String,
    pub kind: DiscountKind,
    pub value: u64,
    pub discount_amount: u64,
    pub subtotal: u64,
    pub total_before: u64,
    pub total_after: u64,
}

/// Changes to a discount code; `None` leaves a field as it is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscountCodeUpdate {
    pub code: Option<String>,
    pub kind: Option<DiscountKind>,
    pub value: Option<u64>,
    pub min_purchase: Option<u64>,
    pub max_uses: Option<u64>,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub active: Option<bool>,
}

impl DiscountCodeUpdate {
    /// Deactivate a code and change nothing else.
    #[must_use]
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Self::default()
        }
    }

    /// Overlay the provided fields onto `discount`.
    pub fn apply_to(self, discount: &mut DiscountCode) {
        let rule = &mut discount.rule;

        if let Some(code) = self.code {
            discount.code = normalize_code(&code);
        }

        if let Some(kind) = self.kind {
            rule.kind = kind;
        }

        if let Some(value) = self.value {
            rule.value = value;
        }

        if let Some(min_purchase) = self.min_purchase {
            rule.min_purchase = min_purchase;
        }

        if let Some(max_uses) = self.max_uses {
            rule.max_uses = Some(max_uses);
        }

        if let Some(starts_at) = self.starts_at {
            rule.starts_at = Some(starts_at);
        }

        if let Some(expires_at) = self.expires_at {
            rule.expires_at = Some(expires_at);
        }

        if let Some(active) = self.active {
            rule.active = active;
        }
    }
}

/// Filters for the admin discount code listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscountFilter {
    pub active: Option<bool>,

    /// Only codes redeemable right now.
    pub valid_only: bool,

    pub kind: Option<DiscountKind>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl DiscountFilter {
    /// Page number, starting at 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.per_page())
    }
}

/// One page of discount codes plus the number matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountPage {
    pub discounts: Vec<DiscountCode>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Usage figures for one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountStats {
    pub discount: DiscountCode,
    pub is_valid: bool,
    pub used_count: u64,

    /// Uses left under the cap; `None` when unlimited.
    pub remaining_uses: Option<u64>,

    /// Whole days until expiry, negative once expired.
    pub days_until_expiry: Option<i64>,
}

impl DiscountStats {
    #[must_use]
    pub fn at(discount: DiscountCode, now: Timestamp) -> Self {
        let rule = &discount.rule;

        Self {
            is_valid: rule.is_valid(now),
            used_count: rule.used_count,
            remaining_uses: rule
                .max_uses
                .map(|max_uses| max_uses.saturating_sub(rule.used_count)),
            days_until_expiry: rule
                .expires_at
                .map(|expires_at| expires_at.duration_since(now).as_hours() / 24),
            discount,
        }
    }
}

/// What removing a code did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountRemoval {
    Deleted,

    /// Redeemed codes are kept for order history and only deactivated.
    Deactivated(DiscountCode),
}

/// Codes are matched case-insensitively and ignoring surrounding whitespace.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
