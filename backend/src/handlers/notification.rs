//! HTTP handlers for notification read state

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{Notification, NotificationBucket, NotificationView, UnreadCounts};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadBulkRequest {
    #[validate(length(min = 1, message = "An array of notification IDs is required"))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadForViewRequest {
    pub view: NotificationView,
    pub business_unit: NotificationBucket,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// Notifications visible to the caller, newest first
pub async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<NotificationsResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let notifications = NotificationService::new(state.db)
        .list(&user.viewer(), query.unread_only.unwrap_or(false), limit)
        .await?;

    Ok(Json(NotificationsResponse { notifications }))
}

/// Unread counts per brand and type
pub async fn get_unread_counts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UnreadCounts>> {
    let counts = NotificationService::new(state.db).unread_counts(&user.viewer()).await?;
    Ok(Json(counts))
}

/// Mark one notification as read
pub async fn mark_as_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification = NotificationService::new(state.db)
        .mark_read(&user.viewer(), notification_id)
        .await?;
    Ok(Json(notification))
}

/// Mark several notifications as read
pub async fn mark_read_bulk(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<MarkReadBulkRequest>,
) -> AppResult<Json<NotificationsResponse>> {
    input.validate()?;

    let notifications = NotificationService::new(state.db)
        .mark_read_bulk(&user.viewer(), &input.ids)
        .await?;

    Ok(Json(NotificationsResponse { notifications }))
}

/// Clear the notifications a screen covers for one brand
pub async fn mark_read_for_view(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<MarkReadForViewRequest>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = NotificationService::new(state.db)
        .mark_read_for_view(&user.viewer(), input.view, input.business_unit)
        .await?;

    Ok(Json(NotificationsResponse { notifications }))
}
