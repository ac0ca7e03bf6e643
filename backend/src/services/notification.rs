//! Notification service: emission inside write transactions and read-state updates
//!
//! Visibility follows [`shared::Viewer`]: privileged roles see every row,
//! everyone else only rows addressed to them. Every read-state update is a
//! single statement restricted to visible rows.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::{unread_counts, Notification, NotificationBucket, NotificationView, UnreadCounts, Viewer};

use super::parse_stored;
use crate::error::{AppError, AppResult};

/// Notification service for managing notifications
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    notification_type: String,
    business_unit: String,
    message: String,
    link: String,
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl NotificationRow {
    fn into_notification(self) -> AppResult<Notification> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            notification_type: parse_stored(&self.notification_type, "notifications.type")?,
            business_unit: parse_stored(&self.business_unit, "notifications.business_unit")?,
            message: self.message,
            link: parse_stored(&self.link, "notifications.link")?,
            created_at: self.created_at,
            is_read: self.is_read,
        })
    }
}

fn into_notifications(rows: Vec<NotificationRow>) -> AppResult<Vec<Notification>> {
    rows.into_iter().map(NotificationRow::into_notification).collect()
}

const RETURNING_COLUMNS: &str =
    "id, user_id, type AS notification_type, business_unit, message, link, created_at, is_read";

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a notification as part of the caller's transaction
    pub async fn insert(conn: &mut PgConnection, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, type, business_unit, message, link, created_at, is_read)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(notification.business_unit.as_str())
        .bind(&notification.message)
        .bind(notification.link.as_str())
        .bind(notification.created_at)
        .bind(notification.is_read)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            kind = %notification.notification_type,
            "Queued notification"
        );

        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Notifications visible to the viewer, newest first
    pub async fn list(&self, viewer: &Viewer, unread_only: bool, limit: i64) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE ($1 OR user_id = $2)
              AND (NOT $3 OR NOT is_read)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
            RETURNING_COLUMNS
        ))
        .bind(viewer.privileged)
        .bind(viewer.user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        into_notifications(rows)
    }

    /// Unread counts per brand bucket and type
    pub async fn unread_counts(&self, viewer: &Viewer) -> AppResult<UnreadCounts> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE NOT is_read AND ($1 OR user_id = $2)
            "#,
            RETURNING_COLUMNS
        ))
        .bind(viewer.privileged)
        .bind(viewer.user_id)
        .fetch_all(&self.db)
        .await?;

        let notifications = into_notifications(rows)?;
        Ok(unread_counts(&notifications, viewer))
    }

    // ========================================================================
    // Read-state transitions
    // ========================================================================

    /// Mark one notification as read
    pub async fn mark_read(&self, viewer: &Viewer, id: Uuid) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND ($2 OR user_id = $3)
            RETURNING {}
            "#,
            RETURNING_COLUMNS
        ))
        .bind(id)
        .bind(viewer.privileged)
        .bind(viewer.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))?;

        row.into_notification()
    }

    /// Mark a set of notifications as read in one statement
    pub async fn mark_read_bulk(&self, viewer: &Viewer, ids: &[Uuid]) -> AppResult<Vec<Notification>> {
        if ids.is_empty() {
            return Err(AppError::validation("ids", "An array of notification IDs is required"));
        }

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = ANY($1) AND ($2 OR user_id = $3)
            RETURNING {}
            "#,
            RETURNING_COLUMNS
        ))
        .bind(ids)
        .bind(viewer.privileged)
        .bind(viewer.user_id)
        .fetch_all(&self.db)
        .await?;

        into_notifications(rows)
    }

    /// Clear every unread notification the view covers for one brand bucket.
    /// Returns the rows that changed.
    pub async fn mark_read_for_view(
        &self,
        viewer: &Viewer,
        view: NotificationView,
        bucket: NotificationBucket,
    ) -> AppResult<Vec<Notification>> {
        let types: Vec<String> = view.types().iter().map(|t| t.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE NOT is_read
              AND type = ANY($1)
              AND business_unit = $2
              AND ($3 OR user_id = $4)
            RETURNING {}
            "#,
            RETURNING_COLUMNS
        ))
        .bind(types)
        .bind(bucket.as_str())
        .bind(viewer.privileged)
        .bind(viewer.user_id)
        .fetch_all(&self.db)
        .await?;

        tracing::info!(
            user_id = %viewer.user_id,
            view = view.as_str(),
            bucket = %bucket,
            cleared = rows.len(),
            "Marked notifications read for view"
        );

        into_notifications(rows)
    }
}
