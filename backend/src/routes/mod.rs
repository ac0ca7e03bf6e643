//! Route definitions for the VMI proposal server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Dispensary storefront (license number)
        .nest("/public", public_routes())
        // Protected routes - proposals
        .nest("/vmi-proposals", proposal_routes(state.clone()))
        // Protected routes - dispensary lookups
        .nest("/dispensaries", dispensary_routes(state.clone()))
        // Protected routes - carts, orders and catalog
        .merge(order_routes(state.clone()))
        // Protected routes - notifications
        .nest("/notifications", notification_routes(state))
}

/// Storefront routes, authenticated per request by license number
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", post(handlers::submit_public_cart))
        .route("/catalog", get(handlers::get_public_catalog))
        .route(
            "/dispensaries/active-proposal",
            get(handlers::get_public_active_proposal),
        )
}

/// VMI proposal routes (protected)
fn proposal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_proposals).post(handlers::create_proposal))
        .route(
            "/:proposal_id",
            get(handlers::get_proposal).delete(handlers::delete_proposal),
        )
        .route("/:proposal_id/versions", post(handlers::append_version))
        .route("/:proposal_id/accept", post(handlers::accept_proposal))
        .route("/:proposal_id/reject", post(handlers::reject_proposal))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dispensary routes (protected)
fn dispensary_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:dispensary_id/active-proposal",
            get(handlers::get_active_proposal),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Cart, order history and admin catalog routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/cart", post(handlers::submit_cart))
        .route("/orders", get(handlers::list_orders))
        .route("/catalog", get(handlers::get_catalog))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_notifications))
        .route("/unread-counts", get(handlers::get_unread_counts))
        .route("/read-bulk", post(handlers::mark_read_bulk))
        .route("/read-for-view", post(handlers::mark_read_for_view))
        .route("/:notification_id/read", post(handlers::mark_as_read))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
