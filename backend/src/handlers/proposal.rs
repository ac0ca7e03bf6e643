//! VMI proposal handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{Action, AuthorRole, FulfillmentUnit, OrderItem, Resource};

use super::admin_unit_filter;
use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser, LicensedDispensary};
use crate::services::proposal::{AppendOutcome, NewProposal, ProposalFilter, ProposalView};
use crate::services::ProposalService;
use crate::AppState;

fn proposal_service(state: &AppState) -> ProposalService {
    ProposalService::new(state.db.clone(), state.config.proposals.edit_policy())
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposalRequest {
    pub dispensary_id: Uuid,
    /// Defaults to the calling user
    pub sales_rep_id: Option<Uuid>,
    pub business_unit: FulfillmentUnit,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppendVersionRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListProposalsQuery {
    pub dispensary_id: Option<Uuid>,
    pub business_unit: Option<String>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProposalsResponse {
    pub proposals: Vec<ProposalView>,
}

#[derive(Debug, Serialize)]
pub struct ActiveProposalResponse {
    pub proposal: Option<ProposalView>,
}

// ============================================================================
// Staff routes
// ============================================================================

/// Create a proposal for a dispensary, superseding its active one
pub async fn create_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProposalRequest>,
) -> AppResult<(StatusCode, Json<ProposalView>)> {
    check_permission(&user, Resource::OrdersVmi, Action::Edit)?;
    input.validate()?;

    let proposal = proposal_service(&state)
        .create(NewProposal {
            dispensary_id: input.dispensary_id,
            sales_rep_id: input.sales_rep_id.unwrap_or(user.user_id),
            business_unit: input.business_unit,
            items: input.items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ProposalView::from(proposal))))
}

/// List proposals
pub async fn list_proposals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListProposalsQuery>,
) -> AppResult<Json<ProposalsResponse>> {
    check_permission(&user, Resource::OrdersVmi, Action::View)?;

    let filter = ProposalFilter {
        dispensary_id: query.dispensary_id,
        business_unit: admin_unit_filter(query.business_unit.as_deref())?,
        active_only: query.active_only.unwrap_or(false),
    };
    let proposals = proposal_service(&state).list(&filter).await?;

    Ok(Json(ProposalsResponse { proposals }))
}

/// Proposal with its full version history
pub async fn get_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<Json<ProposalView>> {
    check_permission(&user, Resource::OrdersVmi, Action::View)?;
    Ok(Json(proposal_service(&state).get(proposal_id).await?))
}

/// Append a rep-authored version
pub async fn append_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
    Json(input): Json<AppendVersionRequest>,
) -> AppResult<(StatusCode, Json<AppendOutcome>)> {
    check_permission(&user, Resource::OrdersVmi, Action::Edit)?;
    input.validate()?;

    let outcome = proposal_service(&state)
        .append(proposal_id, input.items, AuthorRole::SalesRep, None)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn accept_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<Json<ProposalView>> {
    check_permission(&user, Resource::OrdersVmi, Action::Edit)?;
    Ok(Json(proposal_service(&state).accept(proposal_id).await?))
}

pub async fn reject_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<Json<ProposalView>> {
    check_permission(&user, Resource::OrdersVmi, Action::Edit)?;
    Ok(Json(proposal_service(&state).reject(proposal_id).await?))
}

/// Delete a proposal with its whole history
pub async fn delete_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    check_permission(&user, Resource::OrdersVmi, Action::Delete)?;
    proposal_service(&state).delete(proposal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Active proposal of a dispensary
pub async fn get_active_proposal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(dispensary_id): Path<Uuid>,
) -> AppResult<Json<ActiveProposalResponse>> {
    check_permission(&user, Resource::OrdersVmi, Action::View)?;
    let proposal = proposal_service(&state).active_for_dispensary(dispensary_id).await?;
    Ok(Json(ActiveProposalResponse { proposal }))
}

// ============================================================================
// Public storefront
// ============================================================================

/// Active proposal of the dispensary identified by license number
pub async fn get_public_active_proposal(
    State(state): State<AppState>,
    LicensedDispensary(dispensary): LicensedDispensary,
) -> AppResult<Json<ActiveProposalResponse>> {
    let proposal = proposal_service(&state).active_for_dispensary(dispensary.id).await?;
    Ok(Json(ActiveProposalResponse { proposal }))
}
