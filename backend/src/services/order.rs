//! Cart submission and order history
//!
//! A regular cart becomes one order per fulfillment unit, all written in a
//! single transaction. A VMI cart creates or edits a proposal instead.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    cart_subtotal, plan_regular_orders, plan_vmi_submission, reconcile_with_catalog, CartContext, CartMode,
    CartOutcome, DomainError, EditPolicy, FulfillmentUnit, Notification, NotificationBucket, Order, OrderItem, VmiAction,
};

use super::items::{insert_items, load_items, ItemOwner};
use super::parse_stored;
use super::proposal::NewProposal;
use super::{CatalogService, DispensaryService, NotificationService, ProposalService};
use crate::error::AppResult;

/// Cart and order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    policy: EditPolicy,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_date: DateTime<Utc>,
    dispensary_id: Uuid,
    sales_rep_id: Option<Uuid>,
    business_unit: String,
}

/// Order as returned to clients, with its computed total
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub total: rust_decimal::Decimal,
}

impl TryFrom<Order> for OrderView {
    type Error = DomainError;

    fn try_from(order: Order) -> Result<Self, Self::Error> {
        let total = order.total()?;
        Ok(Self { order, total })
    }
}

/// Filters for order history
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub business_unit: Option<FulfillmentUnit>,
    pub dispensary_id: Option<Uuid>,
    pub sales_rep_id: Option<Uuid>,
}

impl OrderService {
    pub fn new(db: PgPool, policy: EditPolicy) -> Self {
        Self { db, policy }
    }

    /// Submit a cart in either mode
    pub async fn submit_cart(
        &self,
        items: Vec<OrderItem>,
        mode: CartMode,
        context: CartContext,
    ) -> AppResult<CartOutcome> {
        match mode {
            CartMode::Regular => {
                let created_order_ids = self.place_regular(&items, &context).await?;
                Ok(CartOutcome::Orders { created_order_ids })
            }
            CartMode::Vmi => {
                let proposal = self.submit_vmi(items, &context).await?;
                Ok(CartOutcome::Proposal { proposal })
            }
        }
    }

    /// Split the cart by fulfillment unit and create every order, or none
    async fn place_regular(&self, items: &[OrderItem], context: &CartContext) -> AppResult<Vec<Uuid>> {
        plan_regular_orders(items)?;

        let mut tx = self.db.begin().await?;

        let dispensary = DispensaryService::find(&mut tx, context.dispensary_id).await?;
        let ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
        let catalog = CatalogService::load_entries(&mut tx, &ids).await?;
        let items = reconcile_with_catalog(items, &catalog)?;
        let plans = plan_regular_orders(&items)?;

        let sales_rep_id = dispensary.sales_rep_id.or(context.sales_rep_id);
        let now = Utc::now();
        let mut created = Vec::with_capacity(plans.len());

        for plan in plans {
            let order = plan.into_order(Uuid::new_v4(), now, dispensary.id, sales_rep_id);

            sqlx::query(
                r#"
                INSERT INTO orders (id, order_date, dispensary_id, sales_rep_id, business_unit)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(order.order_date)
            .bind(order.dispensary_id)
            .bind(order.sales_rep_id)
            .bind(order.business_unit.as_str())
            .execute(&mut *tx)
            .await?;

            insert_items(&mut tx, ItemOwner::Order, order.id, &order.items).await?;

            if let Some(rep_id) = order.sales_rep_id {
                let notification = Notification::order_placed(
                    Uuid::new_v4(),
                    rep_id,
                    NotificationBucket::from(order.business_unit),
                    &dispensary.name,
                    now,
                );
                NotificationService::insert(&mut tx, &notification).await?;
            }

            let subtotal = cart_subtotal(&order.items)?;
            tracing::debug!(
                order_id = %order.id,
                business_unit = %order.business_unit,
                subtotal = %subtotal,
                "Prepared order"
            );
            created.push(order.id);
        }

        tx.commit().await?;

        tracing::info!(
            dispensary_id = %dispensary.id,
            orders = ?created,
            "Placed regular cart"
        );

        Ok(created)
    }

    async fn submit_vmi(&self, items: Vec<OrderItem>, context: &CartContext) -> AppResult<shared::Proposal> {
        let proposals = ProposalService::new(self.db.clone(), self.policy);

        match plan_vmi_submission(context)? {
            VmiAction::Create {
                business_unit,
                sales_rep_id,
            } => {
                proposals
                    .create(NewProposal {
                        dispensary_id: context.dispensary_id,
                        sales_rep_id,
                        business_unit,
                        items,
                    })
                    .await
            }
            VmiAction::Append { proposal_id, author } => {
                proposals
                    .append(proposal_id, items, author, Some(context.dispensary_id))
                    .await?;
                proposals.find(proposal_id).await
            }
        }
    }

    /// Order history, newest first
    pub async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<OrderView>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, order_date, dispensary_id, sales_rep_id, business_unit
            FROM orders
            WHERE ($1::text IS NULL OR business_unit = $1)
              AND ($2::uuid IS NULL OR dispensary_id = $2)
              AND ($3::uuid IS NULL OR sales_rep_id = $3)
            ORDER BY order_date DESC
            "#,
        )
        .bind(filter.business_unit.map(|bu| bu.as_str()))
        .bind(filter.dispensary_id)
        .bind(filter.sales_rep_id)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items: HashMap<Uuid, Vec<OrderItem>> = load_items(&mut conn, ItemOwner::Order, &ids).await?;

        rows.into_iter()
            .map(|row| -> AppResult<OrderView> {
                Ok(OrderView::try_from(Order {
                    business_unit: parse_stored(&row.business_unit, "orders.business_unit")?,
                    items: items.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    order_date: row.order_date,
                    dispensary_id: row.dispensary_id,
                    sales_rep_id: row.sales_rep_id,
                })?)
            })
            .collect()
    }
}
