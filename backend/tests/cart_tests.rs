//! Cart reconciliation and business-unit partitioning tests
//!
//! Properties covered:
//! - A regular cart is partitioned without losing or duplicating items
//! - Every order holds only items of its fulfillment unit
//! - Catalog re-validation takes the stored snapshot from the catalog

use std::collections::HashMap;

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    cart_subtotal, cart_total_units, catalog_scope, fulfillment_scope, plan_regular_orders, plan_vmi_submission,
    public_brand_scope, reconcile_with_catalog, AuthorRole, BusinessUnit, CartContext, CatalogEntry, CatalogView,
    DomainError, FulfillmentUnit, NotificationBucket, OrderItem, VmiAction,
};
use uuid::Uuid;

fn item(id: &str, unit: BusinessUnit, qty: i32, price: Decimal) -> OrderItem {
    OrderItem::new(id, id, "Pre-roll - 5pk", price, qty, id, "Flower", unit)
}

fn staff_context() -> CartContext {
    CartContext {
        dispensary_id: Uuid::new_v4(),
        sales_rep_id: Some(Uuid::new_v4()),
        author: AuthorRole::SalesRep,
        proposal_ref: None,
        business_unit: Some(FulfillmentUnit::Fairwinds),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_fulfillment_mapping() {
        assert_eq!(fulfillment_scope(BusinessUnit::Sunshine), FulfillmentUnit::SunshinePf);
        assert_eq!(fulfillment_scope(BusinessUnit::Fairwinds), FulfillmentUnit::Fairwinds);
        assert_eq!(fulfillment_scope(BusinessUnit::PassionFlower), FulfillmentUnit::Fairwinds);
    }

    #[test]
    fn test_scopes() {
        assert_eq!(catalog_scope(CatalogView::Sunshine), &[BusinessUnit::Sunshine]);
        assert!(catalog_scope(CatalogView::FairwindsPf).contains(&BusinessUnit::PassionFlower));
        assert!(public_brand_scope(FulfillmentUnit::SunshinePf).contains(&BusinessUnit::PassionFlower));
        assert!(!public_brand_scope(FulfillmentUnit::Fairwinds).contains(&BusinessUnit::Sunshine));
    }

    #[test]
    fn test_notification_bucket_alias() {
        assert_eq!("passion-flower".parse::<NotificationBucket>().unwrap(), NotificationBucket::Fairwinds);
        assert_eq!(NotificationBucket::from(BusinessUnit::PassionFlower), NotificationBucket::Fairwinds);
        assert!(matches!(
            "moonlight".parse::<BusinessUnit>(),
            Err(DomainError::UnknownBusinessUnit(_))
        ));
    }

    #[test]
    fn test_mixed_cart_scenario() {
        let cart = vec![
            item("A", BusinessUnit::Sunshine, 2, dec!(10)),
            item("B", BusinessUnit::PassionFlower, 1, dec!(25)),
            item("C", BusinessUnit::Fairwinds, 4, dec!(5)),
        ];

        let plans = plan_regular_orders(&cart).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].business_unit, FulfillmentUnit::SunshinePf);
        assert_eq!(plans[0].items.len(), 1);
        assert_eq!(plans[1].business_unit, FulfillmentUnit::Fairwinds);
        assert_eq!(
            plans[1].items.iter().map(|i| i.product_id.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );

        let order = plans[1].clone().into_order(Uuid::new_v4(), Utc::now(), Uuid::new_v4(), None);
        assert_eq!(order.total(), Ok(dec!(45)));
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(plan_regular_orders(&[]), Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let cart = vec![item("A", BusinessUnit::Sunshine, 0, dec!(10))];
        assert!(plan_regular_orders(&cart).is_err());
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let cart = vec![
            item("A", BusinessUnit::Sunshine, 1, dec!(10)),
            item("A", BusinessUnit::Sunshine, 2, dec!(10)),
        ];
        assert!(matches!(plan_regular_orders(&cart), Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_vmi_submission_decisions() {
        let ctx = staff_context();
        assert_eq!(
            plan_vmi_submission(&ctx).unwrap(),
            VmiAction::Create {
                business_unit: FulfillmentUnit::Fairwinds,
                sales_rep_id: ctx.sales_rep_id.unwrap(),
            }
        );

        let proposal_id = Uuid::new_v4();
        let editing = CartContext {
            proposal_ref: Some(proposal_id),
            author: AuthorRole::Dispensary,
            ..staff_context()
        };
        assert_eq!(
            plan_vmi_submission(&editing).unwrap(),
            VmiAction::Append {
                proposal_id,
                author: AuthorRole::Dispensary,
            }
        );

        let dispensary_create = CartContext {
            author: AuthorRole::Dispensary,
            ..staff_context()
        };
        assert!(plan_vmi_submission(&dispensary_create).is_err());
    }

    #[test]
    fn test_catalog_reconciliation() {
        let mut catalog = HashMap::new();
        catalog.insert(
            "A".to_string(),
            CatalogEntry {
                product_id: "A".to_string(),
                name: "Blue Dream 3.5g".to_string(),
                sku: "SUN-BD-35".to_string(),
                product_type: "Flower - 3.5g".to_string(),
                category: "Flower".to_string(),
                price: dec!(10),
                business_unit: BusinessUnit::Sunshine,
            },
        );

        let stored = reconcile_with_catalog(&[item("A", BusinessUnit::Sunshine, 3, dec!(10))], &catalog).unwrap();
        assert_eq!(stored[0].name, "Blue Dream 3.5g");
        assert_eq!(stored[0].sku, "SUN-BD-35");
        assert_eq!(stored[0].line_total, dec!(30));

        let stale_price = item("A", BusinessUnit::Sunshine, 3, dec!(9));
        assert!(reconcile_with_catalog(&[stale_price], &catalog).is_err());

        let unknown = item("Q", BusinessUnit::Sunshine, 1, dec!(10));
        assert!(reconcile_with_catalog(&[unknown], &catalog).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn unit_strategy() -> impl Strategy<Value = BusinessUnit> {
        prop_oneof![
            Just(BusinessUnit::Sunshine),
            Just(BusinessUnit::Fairwinds),
            Just(BusinessUnit::PassionFlower),
        ]
    }

    fn cart_strategy() -> impl Strategy<Value = Vec<OrderItem>> {
        prop::collection::btree_map("[a-z]{1,6}", (unit_strategy(), 1..100i32, 1..10_000i64), 1..15).prop_map(
            |lines| {
                lines
                    .into_iter()
                    .map(|(id, (unit, qty, cents))| item(&id, unit, qty, Decimal::new(cents, 2)))
                    .collect()
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Partitioning keeps every item exactly once
        #[test]
        fn prop_partition_conserves_items(cart in cart_strategy()) {
            let plans = plan_regular_orders(&cart).unwrap();

            let planned: Vec<&OrderItem> = plans.iter().flat_map(|p| p.items.iter()).collect();
            prop_assert_eq!(planned.len(), cart.len());
            for original in &cart {
                prop_assert_eq!(planned.iter().filter(|i| ***i == *original).count(), 1);
            }

            let plan_units: i64 = plans.iter().map(|p| cart_total_units(&p.items)).sum();
            prop_assert_eq!(plan_units, cart_total_units(&cart));

            let plan_totals: Decimal = plans.iter().map(|p| cart_subtotal(&p.items).unwrap()).sum();
            prop_assert_eq!(plan_totals, cart_subtotal(&cart).unwrap());
        }

        /// Each order only holds items of its fulfillment unit
        #[test]
        fn prop_orders_are_homogeneous(cart in cart_strategy()) {
            let plans = plan_regular_orders(&cart).unwrap();

            prop_assert!(!plans.is_empty() && plans.len() <= 2);
            for plan in &plans {
                prop_assert!(!plan.items.is_empty());
                prop_assert!(plan.items.iter().all(|i| i.fulfillment_unit() == plan.business_unit));
            }
            if plans.len() == 2 {
                prop_assert_eq!(plans[0].business_unit, FulfillmentUnit::SunshinePf);
            }
        }

        /// Line totals are rounded to two decimal places
        #[test]
        fn prop_line_totals_have_money_scale(cart in cart_strategy()) {
            for line in &cart {
                prop_assert!(line.line_total.scale() <= 2);
                prop_assert!(line.has_consistent_total());
            }
        }
    }
}
