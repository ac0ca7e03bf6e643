//! Validation utilities for carts, proposals and catalog reconciliation
//!
//! Everything here runs before a write is attempted, so a failed check never
//! leaves partial state behind.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};
use crate::models::{line_total, BusinessUnit, CatalogEntry, OrderItem, MAX_MONEY, MAX_ORDER_QTY};

// ============================================================================
// Item List Validations
// ============================================================================

/// Check an item list submitted as a cart or proposal version.
///
/// The list must be non-empty, product ids unique, every quantity in
/// `1..=MAX_ORDER_QTY`, prices and line totals within `0..=MAX_MONEY`, and
/// every line total equal to `round(price × qty)`.
pub fn validate_item_list(items: &[OrderItem], field: &str) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::validation(field, "At least one item is required"));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_field = format!("{}[{}]", field, index);

        if item.product_id.trim().is_empty() {
            return Err(DomainError::validation(item_field, "Product id is required"));
        }
        if !seen.insert(item.product_id.as_str()) {
            return Err(DomainError::validation(
                item_field,
                format!("Product {} appears more than once", item.product_id),
            ));
        }
        if item.order_qty <= 0 {
            return Err(DomainError::validation(
                item_field,
                format!("Quantity for {} must be greater than zero", item.product_id),
            ));
        }
        if item.order_qty > MAX_ORDER_QTY {
            return Err(DomainError::validation(
                item_field,
                format!("Quantity for {} cannot exceed {}", item.product_id, MAX_ORDER_QTY),
            ));
        }
        if item.price < Decimal::ZERO {
            return Err(DomainError::validation(
                item_field,
                format!("Price for {} cannot be negative", item.product_id),
            ));
        }
        if item.price > MAX_MONEY {
            return Err(DomainError::validation(
                item_field,
                format!("Price for {} cannot exceed {}", item.product_id, MAX_MONEY),
            ));
        }

        let expected = item
            .expected_line_total()
            .filter(|total| *total <= MAX_MONEY)
            .ok_or_else(|| {
                DomainError::validation(
                    &item_field,
                    format!("Line total for {} cannot exceed {}", item.product_id, MAX_MONEY),
                )
            })?;
        if item.line_total != expected {
            return Err(DomainError::validation(
                item_field,
                format!(
                    "Line total for {} is {} but price × quantity is {}",
                    item.product_id, item.line_total, expected
                ),
            ));
        }
    }

    Ok(())
}

/// Every item must belong to one of `allowed`
pub fn validate_items_in_scope(items: &[OrderItem], allowed: &[BusinessUnit]) -> DomainResult<()> {
    match items.iter().position(|i| !allowed.contains(&i.business_unit)) {
        Some(index) => Err(DomainError::validation(
            format!("items[{}]", index),
            format!(
                "Product {} ({}) is not available for this brand",
                items[index].product_id, items[index].business_unit
            ),
        )),
        None => Ok(()),
    }
}

// ============================================================================
// Catalog Reconciliation
// ============================================================================

/// Re-validate submitted items against the catalog.
///
/// Unknown products, stale prices and inconsistent totals are rejected.
/// The returned items carry name, sku, type, category and business unit
/// from the catalog, so client-side copies of those fields are never stored.
pub fn reconcile_with_catalog(
    items: &[OrderItem],
    catalog: &HashMap<String, CatalogEntry>,
) -> DomainResult<Vec<OrderItem>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let field = format!("items[{}]", index);
            let entry = catalog.get(&item.product_id).ok_or_else(|| {
                DomainError::validation(&field, format!("Unknown product {}", item.product_id))
            })?;

            if item.price != entry.price {
                return Err(DomainError::validation(
                    &field,
                    format!(
                        "Price for {} changed from {} to {}",
                        item.product_id, item.price, entry.price
                    ),
                ));
            }

            let expected = line_total(entry.price, item.order_qty)
                .filter(|total| *total <= MAX_MONEY)
                .ok_or_else(|| {
                    DomainError::validation(
                        &field,
                        format!("Line total for {} cannot exceed {}", item.product_id, MAX_MONEY),
                    )
                })?;
            if item.line_total != expected {
                return Err(DomainError::validation(
                    &field,
                    format!(
                        "Line total for {} is {} but should be {}",
                        item.product_id, item.line_total, expected
                    ),
                ));
            }

            Ok(OrderItem {
                product_id: entry.product_id.clone(),
                name: entry.name.clone(),
                product_type: entry.product_type.clone(),
                price: entry.price,
                order_qty: item.order_qty,
                line_total: expected,
                sku: entry.sku.clone(),
                category: entry.category.clone(),
                business_unit: entry.business_unit,
            })
        })
        .collect()
}

// ============================================================================
// General Validations
// ============================================================================

/// Trim a dispensary license number, rejecting blanks
pub fn normalize_license_number(license: &str) -> DomainResult<&str> {
    let trimmed = license.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("license_number", "License number is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(id: &str, price: Decimal, qty: i32) -> OrderItem {
        OrderItem::new(id, id, "Pre-roll", price, qty, id, "Pre-roll", BusinessUnit::Fairwinds)
    }

    fn catalog() -> HashMap<String, CatalogEntry> {
        let entry = CatalogEntry {
            product_id: "fw-1".to_string(),
            name: "Fairwinds Tincture".to_string(),
            sku: "FW-TIN-30".to_string(),
            product_type: "Tincture - 30ml".to_string(),
            category: "Tinctures".to_string(),
            price: dec!(22.50),
            business_unit: BusinessUnit::Fairwinds,
        };
        HashMap::from([(entry.product_id.clone(), entry)])
    }

    // ========================================================================
    // Item List Tests
    // ========================================================================

    #[test]
    fn test_validate_item_list_valid() {
        let items = vec![item("a", dec!(5.00), 1), item("b", dec!(7.25), 4)];
        assert!(validate_item_list(&items, "items").is_ok());
    }

    #[test]
    fn test_validate_item_list_empty() {
        let err = validate_item_list(&[], "items").unwrap_err();
        assert_eq!(err, DomainError::validation("items", "At least one item is required"));
    }

    #[test]
    fn test_validate_item_list_zero_quantity() {
        assert!(validate_item_list(&[item("a", dec!(5), 0)], "items").is_err());
        assert!(validate_item_list(&[item("a", dec!(5), -2)], "items").is_err());
    }

    #[test]
    fn test_validate_item_list_duplicate_product() {
        let items = vec![item("a", dec!(5), 1), item("a", dec!(5), 2)];
        match validate_item_list(&items, "items") {
            Err(DomainError::Validation { field, .. }) => assert_eq!(field, "items[1]"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_item_list_bad_total() {
        let mut bad = item("a", dec!(5), 2);
        bad.line_total = dec!(9.99);
        assert!(validate_item_list(&[bad], "items").is_err());
    }

    #[test]
    fn test_validate_item_list_overflowing_price() {
        let items = vec![item("a", dec!(5), 1), item("b", Decimal::MAX, 2)];
        match validate_item_list(&items, "items") {
            Err(DomainError::Validation { field, .. }) => assert_eq!(field, "items[1]"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_item_list_quantity_bound() {
        assert!(validate_item_list(&[item("a", dec!(10.00), MAX_ORDER_QTY)], "items").is_ok());

        match validate_item_list(&[item("a", dec!(10.00), i32::MAX)], "items") {
            Err(DomainError::Validation { field, message }) => {
                assert_eq!(field, "items[0]");
                assert!(message.contains("cannot exceed"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_item_list_line_total_fits_column() {
        assert!(validate_item_list(&[item("a", MAX_MONEY, 1)], "items").is_ok());
        assert!(validate_item_list(&[item("a", MAX_MONEY, 2)], "items").is_err());
        assert!(validate_item_list(&[item("a", MAX_MONEY + dec!(0.01), 1)], "items").is_err());
    }

    #[test]
    fn test_validate_items_in_scope() {
        let items = vec![item("a", dec!(1), 1)];
        assert!(validate_items_in_scope(&items, &[BusinessUnit::Fairwinds]).is_ok());
        assert!(validate_items_in_scope(&items, &[BusinessUnit::Sunshine, BusinessUnit::PassionFlower]).is_err());
    }

    // ========================================================================
    // Catalog Reconciliation Tests
    // ========================================================================

    #[test]
    fn test_reconcile_takes_snapshot_from_catalog() {
        let mut submitted = item("fw-1", dec!(22.50), 2);
        submitted.name = "renamed on client".to_string();
        submitted.business_unit = BusinessUnit::Sunshine;

        let reconciled = reconcile_with_catalog(&[submitted], &catalog()).unwrap();
        assert_eq!(reconciled[0].name, "Fairwinds Tincture");
        assert_eq!(reconciled[0].business_unit, BusinessUnit::Fairwinds);
        assert_eq!(reconciled[0].line_total, dec!(45.00));
    }

    #[test]
    fn test_reconcile_unknown_product() {
        assert!(reconcile_with_catalog(&[item("ghost", dec!(1), 1)], &catalog()).is_err());
    }

    #[test]
    fn test_reconcile_stale_price() {
        assert!(reconcile_with_catalog(&[item("fw-1", dec!(20.00), 1)], &catalog()).is_err());
    }

    #[test]
    fn test_reconcile_bad_total() {
        let mut tampered = item("fw-1", dec!(22.50), 2);
        tampered.line_total = dec!(1.00);
        assert!(reconcile_with_catalog(&[tampered], &catalog()).is_err());
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_normalize_license_number() {
        assert_eq!(normalize_license_number("  426849 "), Ok("426849"));
        assert!(normalize_license_number("   ").is_err());
    }
}
