use serde::Serialize;

use ordermgmt_core::{DomainError, DomainResult, Money, ProductId};
use ordermgmt_products::Product;

/// Order line: a snapshot of product name and price at ordering time.
///
/// Items are plain values owned by their order. They never read the product
/// again, so later catalog changes do not alter historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    product_id: ProductId,
    product_name: String,
    unit_price: Money,
    quantity: u32,
    total_price: Money,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> DomainResult<Self> {
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let total_price = unit_price.multiply(quantity)?;

        Ok(Self {
            product_id,
            product_name,
            unit_price,
            quantity,
            total_price,
        })
    }

    /// Snapshot the product's current name and price.
    pub fn from_product(product: &Product, quantity: u32) -> DomainResult<Self> {
        Self::new(product.id_typed(), product.name(), product.price(), quantity)
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_is_unit_price_times_quantity() {
        let item = OrderItem::new(ProductId::new(), "Widget", Money::euro(dec!(10.00)).unwrap(), 2)
            .unwrap();
        assert_eq!(item.total_price(), Money::euro(dec!(20.00)).unwrap());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = OrderItem::new(ProductId::new(), "Widget", Money::euro(dec!(1.00)).unwrap(), 0)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn snapshot_is_detached_from_product() {
        let mut product = Product::new(
            ProductId::new(),
            "Lamp",
            "Desk lamp",
            Money::euro(dec!(15.00)).unwrap(),
            4,
        )
        .unwrap();
        let item = OrderItem::from_product(&product, 1).unwrap();

        product.decrease(4).unwrap();

        assert_eq!(item.product_id(), product.id_typed());
        assert_eq!(item.product_name(), "Lamp");
        assert_eq!(item.unit_price(), Money::euro(dec!(15.00)).unwrap());
    }
}
