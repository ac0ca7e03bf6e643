//! Cart reconciliation: turning a submitted cart into orders or a proposal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business_unit::FulfillmentUnit;
use super::order::{Order, OrderItem};
use super::proposal::{AuthorRole, Proposal};
use crate::error::{DomainError, DomainResult};
use crate::validation::validate_item_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartMode {
    Regular,
    Vmi,
}

/// Everything a cart submission needs to know about who is submitting it.
/// Passed explicitly on every call; nothing is remembered between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartContext {
    pub dispensary_id: Uuid,
    pub sales_rep_id: Option<Uuid>,
    pub author: AuthorRole,
    /// Active proposal being edited, if any
    pub proposal_ref: Option<Uuid>,
    /// Fulfillment value for a new proposal
    pub business_unit: Option<FulfillmentUnit>,
}

/// One order to be created from a regular cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub business_unit: FulfillmentUnit,
    pub items: Vec<OrderItem>,
}

impl OrderPlan {
    pub fn into_order(
        self,
        id: Uuid,
        order_date: DateTime<Utc>,
        dispensary_id: Uuid,
        sales_rep_id: Option<Uuid>,
    ) -> Order {
        Order {
            id,
            order_date,
            dispensary_id,
            sales_rep_id,
            business_unit: self.business_unit,
            items: self.items,
        }
    }
}

/// Split a regular cart into one plan per fulfillment unit.
///
/// Plans come back `sunshine-pf` first, then `fairwinds`; empty groups are
/// skipped. Item order inside a group follows the cart.
pub fn plan_regular_orders(items: &[OrderItem]) -> DomainResult<Vec<OrderPlan>> {
    validate_item_list(items, "items")?;

    let plans = FulfillmentUnit::ALL
        .iter()
        .filter_map(|unit| {
            let group: Vec<OrderItem> = items
                .iter()
                .filter(|item| item.fulfillment_unit() == *unit)
                .cloned()
                .collect();
            (!group.is_empty()).then(|| OrderPlan {
                business_unit: *unit,
                items: group,
            })
        })
        .collect();

    Ok(plans)
}

/// What a VMI cart submission does to the version chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmiAction {
    Create {
        business_unit: FulfillmentUnit,
        sales_rep_id: Uuid,
    },
    Append {
        proposal_id: Uuid,
        author: AuthorRole,
    },
}

/// Decide between creating a proposal and appending to an existing one
pub fn plan_vmi_submission(context: &CartContext) -> DomainResult<VmiAction> {
    if let Some(proposal_id) = context.proposal_ref {
        return Ok(VmiAction::Append {
            proposal_id,
            author: context.author,
        });
    }

    if context.author == AuthorRole::Dispensary {
        return Err(DomainError::validation(
            "proposal_id",
            "Dispensaries can only edit an existing proposal",
        ));
    }

    let business_unit = context.business_unit.ok_or_else(|| {
        DomainError::validation("business_unit", "Business unit is required for a new proposal")
    })?;
    let sales_rep_id = context.sales_rep_id.ok_or_else(|| {
        DomainError::validation("sales_rep_id", "Sales rep is required for a new proposal")
    })?;

    Ok(VmiAction::Create {
        business_unit,
        sales_rep_id,
    })
}

/// Result of a cart submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CartOutcome {
    Orders { created_order_ids: Vec<Uuid> },
    Proposal { proposal: Proposal },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BusinessUnit;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(id: &str, bu: BusinessUnit, qty: i32, price: Decimal) -> OrderItem {
        OrderItem::new(id, id, "Edible - 10pk", price, qty, id, "Edibles", bu)
    }

    fn context(author: AuthorRole) -> CartContext {
        CartContext {
            dispensary_id: Uuid::new_v4(),
            sales_rep_id: Some(Uuid::new_v4()),
            author,
            proposal_ref: None,
            business_unit: Some(FulfillmentUnit::SunshinePf),
        }
    }

    #[test]
    fn test_mixed_cart_splits_into_two_orders() {
        let cart = vec![
            item("X", BusinessUnit::Sunshine, 2, dec!(10)),
            item("Y", BusinessUnit::Fairwinds, 1, dec!(20)),
        ];
        let plans = plan_regular_orders(&cart).unwrap();

        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].business_unit, FulfillmentUnit::SunshinePf);
        assert_eq!(plans[0].items[0].product_id, "X");
        assert_eq!(plans[0].items[0].line_total, dec!(20));
        assert_eq!(plans[1].business_unit, FulfillmentUnit::Fairwinds);
        assert_eq!(plans[1].items[0].product_id, "Y");
        assert_eq!(plans[1].items[0].line_total, dec!(20));
    }

    #[test]
    fn test_passion_flower_goes_to_fairwinds_order() {
        let cart = vec![
            item("P", BusinessUnit::PassionFlower, 1, dec!(5)),
            item("F", BusinessUnit::Fairwinds, 1, dec!(5)),
        ];
        let plans = plan_regular_orders(&cart).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].business_unit, FulfillmentUnit::Fairwinds);
        assert_eq!(plans[0].items.len(), 2);
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(
            plan_regular_orders(&[]),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_plan_into_order() {
        let plans = plan_regular_orders(&[item("X", BusinessUnit::Sunshine, 3, dec!(1.50))]).unwrap();
        let dispensary = Uuid::new_v4();
        let order = plans
            .into_iter()
            .next()
            .unwrap()
            .into_order(Uuid::new_v4(), Utc::now(), dispensary, None);
        assert_eq!(order.dispensary_id, dispensary);
        assert_eq!(order.total(), Ok(dec!(4.50)));
    }

    #[test]
    fn test_vmi_with_reference_appends() {
        let mut ctx = context(AuthorRole::Dispensary);
        let proposal_id = Uuid::new_v4();
        ctx.proposal_ref = Some(proposal_id);
        assert_eq!(
            plan_vmi_submission(&ctx),
            Ok(VmiAction::Append {
                proposal_id,
                author: AuthorRole::Dispensary
            })
        );
    }

    #[test]
    fn test_vmi_without_reference_creates() {
        let ctx = context(AuthorRole::SalesRep);
        assert!(matches!(
            plan_vmi_submission(&ctx),
            Ok(VmiAction::Create {
                business_unit: FulfillmentUnit::SunshinePf,
                ..
            })
        ));
    }

    #[test]
    fn test_dispensary_cannot_create_proposal() {
        let ctx = context(AuthorRole::Dispensary);
        assert!(plan_vmi_submission(&ctx).is_err());
    }

    #[test]
    fn test_new_proposal_requires_business_unit() {
        let mut ctx = context(AuthorRole::SalesRep);
        ctx.business_unit = None;
        assert!(plan_vmi_submission(&ctx).is_err());
    }

    #[test]
    fn test_orders_outcome_serialization() {
        let id = Uuid::nil();
        let json = serde_json::to_value(CartOutcome::Orders {
            created_order_ids: vec![id],
        })
        .unwrap();
        assert_eq!(json["created_order_ids"][0], id.to_string());
    }
}
