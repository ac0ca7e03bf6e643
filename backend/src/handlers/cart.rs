//! Cart submission and order history handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{Action, AuthorRole, CartContext, CartMode, CartOutcome, FulfillmentUnit, OrderItem, Resource};

use super::admin_unit_filter;
use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser, LicensedDispensary};
use crate::services::order::{OrderFilter, OrderView};
use crate::services::OrderService;
use crate::AppState;

fn order_service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.config.proposals.edit_policy())
}

/// Cart submitted by a sales rep or admin on behalf of a dispensary
#[derive(Debug, Deserialize, Validate)]
pub struct StaffCartRequest {
    pub mode: CartMode,
    pub dispensary_id: Uuid,
    #[validate(length(min = 1, message = "Cart is empty"))]
    pub items: Vec<OrderItem>,
    pub proposal_id: Option<Uuid>,
    pub business_unit: Option<FulfillmentUnit>,
}

/// Cart submitted from the dispensary storefront
#[derive(Debug, Deserialize, Validate)]
pub struct PublicCartRequest {
    pub mode: CartMode,
    #[validate(length(min = 1, message = "Cart is empty"))]
    pub items: Vec<OrderItem>,
    pub proposal_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub business_unit: Option<String>,
    pub dispensary_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

/// Capability a staff cart needs in each mode
fn cart_capability(mode: CartMode) -> (Resource, Action) {
    match mode {
        CartMode::Regular => (Resource::OrdersRegular, Action::View),
        CartMode::Vmi => (Resource::OrdersVmi, Action::Edit),
    }
}

/// Submit a cart as a sales rep
pub async fn submit_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<StaffCartRequest>,
) -> AppResult<(StatusCode, Json<CartOutcome>)> {
    let (resource, action) = cart_capability(input.mode);
    check_permission(&user, resource, action)?;
    input.validate()?;

    let context = CartContext {
        dispensary_id: input.dispensary_id,
        sales_rep_id: Some(user.user_id),
        author: AuthorRole::SalesRep,
        proposal_ref: input.proposal_id,
        business_unit: input.business_unit,
    };
    let outcome = order_service(&state)
        .submit_cart(input.items, input.mode, context)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Submit a cart as the dispensary identified by license number
pub async fn submit_public_cart(
    State(state): State<AppState>,
    LicensedDispensary(dispensary): LicensedDispensary,
    Json(input): Json<PublicCartRequest>,
) -> AppResult<(StatusCode, Json<CartOutcome>)> {
    input.validate()?;

    let context = CartContext {
        dispensary_id: dispensary.id,
        sales_rep_id: dispensary.sales_rep_id,
        author: AuthorRole::Dispensary,
        proposal_ref: input.proposal_id,
        business_unit: None,
    };
    let outcome = order_service(&state)
        .submit_cart(input.items, input.mode, context)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Regular order history. Non-privileged users only see their own orders.
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<OrdersResponse>> {
    check_permission(&user, Resource::OrdersRegular, Action::View)?;

    let filter = OrderFilter {
        business_unit: admin_unit_filter(query.business_unit.as_deref())?,
        dispensary_id: query.dispensary_id,
        sales_rep_id: (!user.is_privileged()).then_some(user.user_id),
    };
    let orders = order_service(&state).list_orders(&filter).await?;

    Ok(Json(OrdersResponse { orders }))
}
