//! Order lines and regular (non-VMI) orders

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business_unit::{fulfillment_scope, BusinessUnit, FulfillmentUnit};
use crate::error::{DomainError, DomainResult};

/// Decimal places kept on stored money amounts
pub const MONEY_SCALE: u32 = 2;

/// Largest quantity accepted on a single line
pub const MAX_ORDER_QTY: i32 = 100_000;

/// Largest amount a stored money column (`NUMERIC(12, 2)`) can hold
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, MONEY_SCALE);

/// Round a money amount to storage precision
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `price × quantity` at storage precision, `None` on overflow
pub fn line_total(price: Decimal, quantity: i32) -> Option<Decimal> {
    price.checked_mul(Decimal::from(quantity)).map(round_money)
}

/// Snapshot of a catalog line at negotiation time.
///
/// Each version or order owns its own copy; items are never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "id")]
    pub product_id: String,
    pub name: String,
    pub product_type: String,
    pub price: Decimal,
    #[serde(alias = "orderQty")]
    pub order_qty: i32,
    #[serde(alias = "lineTotal")]
    pub line_total: Decimal,
    pub sku: String,
    pub category: String,
    pub business_unit: BusinessUnit,
}

impl OrderItem {
    /// Build an item with its line total computed from price and quantity.
    ///
    /// An overflowing total saturates at `Decimal::MAX`, which
    /// `validate_item_list` rejects.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        product_type: impl Into<String>,
        price: Decimal,
        order_qty: i32,
        sku: impl Into<String>,
        category: impl Into<String>,
        business_unit: BusinessUnit,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            product_type: product_type.into(),
            price,
            order_qty,
            line_total: line_total(price, order_qty).unwrap_or(Decimal::MAX),
            sku: sku.into(),
            category: category.into(),
            business_unit,
        }
    }

    pub fn fulfillment_unit(&self) -> FulfillmentUnit {
        fulfillment_scope(self.business_unit)
    }

    /// Line total this item must carry for its price and quantity
    pub fn expected_line_total(&self) -> Option<Decimal> {
        line_total(self.price, self.order_qty)
    }

    pub fn has_consistent_total(&self) -> bool {
        self.expected_line_total() == Some(self.line_total)
    }
}

/// Sum of line totals
pub fn cart_subtotal(items: &[OrderItem]) -> DomainResult<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total))
        .ok_or_else(|| DomainError::validation("items", "Cart total is out of range"))
}

/// Sum of ordered units
pub fn cart_total_units(items: &[OrderItem]) -> i64 {
    items.iter().map(|i| i64::from(i.order_qty)).sum()
}

/// A regular order. Created once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_date: DateTime<Utc>,
    pub dispensary_id: Uuid,
    pub sales_rep_id: Option<Uuid>,
    pub business_unit: FulfillmentUnit,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn total(&self) -> DomainResult<Decimal> {
        cart_subtotal(&self.items)
    }
}
