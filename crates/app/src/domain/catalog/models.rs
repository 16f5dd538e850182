//! Catalog Models

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<Product>;

/// Product Variant UUID
pub type VariantUuid = TypedUuid<ProductVariant>;

/// Product Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub uuid: ProductUuid,
    pub title: String,
    pub sku: String,
    pub base_price: u64,
    pub currency: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Product Variant Model
///
/// A variant's price is the product's base price plus `price_adjustment`, which may be negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVariant {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub sku: String,
    pub name: String,
    pub price_adjustment: i64,
    pub stock: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProductVariant {
    /// Live unit price of this variant, or `None` if the adjustment would make it negative.
    #[must_use]
    pub fn unit_price(&self, product: &Product) -> Option<u64> {
        product.base_price.checked_add_signed(self.price_adjustment)
    }
}

/// New Product Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub title: String,
    pub sku: String,
    pub base_price: u64,
    pub currency: String,
}

/// New Product Variant Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductVariant {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub sku: String,
    pub name: String,
    pub price_adjustment: i64,
    pub stock: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(base_price: u64) -> Product {
        Product {
            uuid: ProductUuid::new(),
            title: "Linocut print".to_string(),
            sku: "LINO-01".to_string(),
            base_price,
            currency: "EUR".to_string(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn variant(product: &Product, price_adjustment: i64) -> ProductVariant {
        ProductVariant {
            uuid: VariantUuid::new(),
            product_uuid: product.uuid,
            sku: "LINO-01-A3".to_string(),
            name: "A3".to_string(),
            price_adjustment,
            stock: 4,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn unit_price_adds_adjustment() {
        let product = product(2_500);

        assert_eq!(variant(&product, 500).unit_price(&product), Some(3_000));
        assert_eq!(variant(&product, -500).unit_price(&product), Some(2_000));
    }

    #[test]
    fn unit_price_rejects_negative_results() {
        let product = product(100);

        assert_eq!(variant(&product, -101).unit_price(&product), None);
    }
}
