//! WebAssembly module for the multi-brand order tool
//!
//! Lets the browser preview what the server will do with a cart or a
//! proposal edit, using the same rules as the backend:
//! - proposal diff preview and version display status
//! - business-unit to fulfillment mapping and cart split preview
//! - cart subtotal
//! - unread counts and optimistic read-for-view selection
//!
//! Values cross the boundary as JSON strings.

use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use shared::{
    cart_subtotal, diff, fulfillment_scope, plan_regular_orders, select_for_view, unread_counts, BusinessUnit,
    Notification, NotificationBucket, NotificationView, OrderItem, ProposalStatus, ProposalVersion, Viewer,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("brand-orders-wasm loaded"));
}

fn to_js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn parse_viewer(user_id: &str, privileged: bool) -> Result<Viewer, String> {
    let user_id = Uuid::parse_str(user_id).map_err(|e| format!("Invalid user id: {}", e))?;
    Ok(Viewer { user_id, privileged })
}

// ============================================================================
// Proposals
// ============================================================================

fn diff_json(previous: &str, next: &str) -> Result<String, String> {
    let previous: Vec<OrderItem> = parse_json(previous, "previous items")?;
    let next: Vec<OrderItem> = parse_json(next, "next items")?;
    to_json(&diff(&previous, &next))
}

/// Changes an edit would record, as a JSON array
#[wasm_bindgen]
pub fn preview_diff(previous_items_json: &str, next_items_json: &str) -> Result<String, JsValue> {
    diff_json(previous_items_json, next_items_json).map_err(to_js_error)
}

fn display_status_json(version: &str, proposal_status: &str, is_latest: bool) -> Result<String, String> {
    let version: ProposalVersion = parse_json(version, "version")?;
    let status: ProposalStatus = proposal_status.parse().map_err(|e: shared::DomainError| e.to_string())?;
    to_json(&version.display_status(status, is_latest))
}

/// Display status of a version, e.g. `"Sent"`
#[wasm_bindgen]
pub fn version_display_status(version_json: &str, proposal_status: &str, is_latest: bool) -> Result<String, JsValue> {
    display_status_json(version_json, proposal_status, is_latest).map_err(to_js_error)
}

// ============================================================================
// Carts
// ============================================================================

fn fulfillment_for(business_unit: &str) -> Result<String, String> {
    let unit: BusinessUnit = business_unit.parse().map_err(|e: shared::DomainError| e.to_string())?;
    Ok(fulfillment_scope(unit).as_str().to_string())
}

/// Fulfillment value a product of `business_unit` ships under
#[wasm_bindgen]
pub fn fulfillment_unit_for(business_unit: &str) -> Result<String, JsValue> {
    fulfillment_for(business_unit).map_err(to_js_error)
}

fn cart_split_json(items: &str) -> Result<String, String> {
    let items: Vec<OrderItem> = parse_json(items, "cart")?;
    let plans = plan_regular_orders(&items).map_err(|e| e.to_string())?;
    to_json(&plans)
}

/// Orders a regular cart would be split into
#[wasm_bindgen]
pub fn preview_cart_split(items_json: &str) -> Result<String, JsValue> {
    cart_split_json(items_json).map_err(to_js_error)
}

fn subtotal_of(items: &str) -> Result<String, String> {
    let items: Vec<OrderItem> = parse_json(items, "cart")?;
    let subtotal = cart_subtotal(&items).map_err(|e| e.to_string())?;
    Ok(subtotal.to_string())
}

/// Cart subtotal as a decimal string
#[wasm_bindgen]
pub fn cart_subtotal_of(items_json: &str) -> Result<String, JsValue> {
    subtotal_of(items_json).map_err(to_js_error)
}

// ============================================================================
// Notifications
// ============================================================================

fn unread_counts_json(notifications: &str, user_id: &str, privileged: bool) -> Result<String, String> {
    let notifications: Vec<Notification> = parse_json(notifications, "notifications")?;
    let viewer = parse_viewer(user_id, privileged)?;
    to_json(&unread_counts(&notifications, &viewer))
}

/// Unread counts per brand bucket and type
#[wasm_bindgen]
pub fn count_unread(notifications_json: &str, user_id: &str, privileged: bool) -> Result<String, JsValue> {
    unread_counts_json(notifications_json, user_id, privileged).map_err(to_js_error)
}

fn read_for_view_json(
    notifications: &str,
    user_id: &str,
    privileged: bool,
    view: &str,
    bucket: &str,
) -> Result<String, String> {
    let notifications: Vec<Notification> = parse_json(notifications, "notifications")?;
    let viewer = parse_viewer(user_id, privileged)?;
    let view: NotificationView = view.parse().map_err(|e: shared::DomainError| e.to_string())?;
    let bucket: NotificationBucket = bucket.parse().map_err(|e: shared::DomainError| e.to_string())?;
    to_json(&select_for_view(&notifications, &viewer, view, bucket))
}

/// Ids the server will mark read when `view` opens for `bucket`
#[wasm_bindgen]
pub fn select_read_for_view(
    notifications_json: &str,
    user_id: &str,
    privileged: bool,
    view: &str,
    bucket: &str,
) -> Result<String, JsValue> {
    read_for_view_json(notifications_json, user_id, privileged, view, bucket).map_err(to_js_error)
}
