//! Notification routing and read-state rules

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business_unit::NotificationBucket;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "order-regular")]
    OrderRegular,
    #[serde(rename = "order-vmi")]
    OrderVmi,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderRegular => "order-regular",
            NotificationType::OrderVmi => "order-vmi",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order-regular" => Ok(NotificationType::OrderRegular),
            "order-vmi" => Ok(NotificationType::OrderVmi),
            other => Err(DomainError::validation(
                "type",
                format!("unknown notification type '{}'", other),
            )),
        }
    }
}

/// A screen whose opening clears a group of notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationView {
    #[serde(rename = "orders-received")]
    OrdersReceived,
}

impl NotificationView {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationView::OrdersReceived => "orders-received",
        }
    }

    /// Notification types cleared when this view is opened
    pub fn types(&self) -> &'static [NotificationType] {
        match self {
            NotificationView::OrdersReceived => &[NotificationType::OrderRegular, NotificationType::OrderVmi],
        }
    }
}

impl FromStr for NotificationView {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders-received" => Ok(NotificationView::OrdersReceived),
            other => Err(DomainError::validation(
                "view",
                format!("unknown notification view '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub business_unit: NotificationBucket,
    pub message: String,
    pub link: NotificationView,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Notification {
    /// Notice to a sales rep that a regular order came in
    pub fn order_placed(
        id: Uuid,
        user_id: Uuid,
        business_unit: NotificationBucket,
        dispensary_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            notification_type: NotificationType::OrderRegular,
            business_unit,
            message: format!("New order received from {}", dispensary_name),
            link: NotificationView::OrdersReceived,
            created_at,
            is_read: false,
        }
    }

    /// Notice to a sales rep that a dispensary changed a proposal
    pub fn proposal_changed(
        id: Uuid,
        user_id: Uuid,
        business_unit: NotificationBucket,
        dispensary_name: &str,
        version_number: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            notification_type: NotificationType::OrderVmi,
            business_unit,
            message: format!(
                "{} submitted changes to a VMI proposal (version {})",
                dispensary_name, version_number
            ),
            link: NotificationView::OrdersReceived,
            created_at,
            is_read: false,
        }
    }

    pub fn matches_view(&self, view: NotificationView, bucket: NotificationBucket) -> bool {
        self.business_unit == bucket && view.types().contains(&self.notification_type)
    }
}

/// Who is looking at notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: Uuid,
    /// Admin-level roles see every notification
    pub privileged: bool,
}

impl Viewer {
    pub fn can_see(&self, notification: &Notification) -> bool {
        self.privileged || notification.user_id == self.user_id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub regular: u32,
    pub vmi: u32,
}

impl TypeCounts {
    pub fn total(&self) -> u32 {
        self.regular + self.vmi
    }
}

/// Unread counts per notification bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub sunshine: TypeCounts,
    pub fairwinds: TypeCounts,
}

impl UnreadCounts {
    pub fn bucket(&self, bucket: NotificationBucket) -> &TypeCounts {
        match bucket {
            NotificationBucket::Sunshine => &self.sunshine,
            NotificationBucket::Fairwinds => &self.fairwinds,
        }
    }

    pub fn total(&self) -> u32 {
        self.sunshine.total() + self.fairwinds.total()
    }
}

/// Count unread notifications visible to `viewer`
pub fn unread_counts(notifications: &[Notification], viewer: &Viewer) -> UnreadCounts {
    notifications
        .iter()
        .filter(|n| !n.is_read && viewer.can_see(n))
        .fold(UnreadCounts::default(), |mut acc, n| {
            let counts = match n.business_unit {
                NotificationBucket::Sunshine => &mut acc.sunshine,
                NotificationBucket::Fairwinds => &mut acc.fairwinds,
            };
            match n.notification_type {
                NotificationType::OrderRegular => counts.regular += 1,
                NotificationType::OrderVmi => counts.vmi += 1,
            }
            acc
        })
}

/// Notifications visible to `viewer`, newest first
pub fn visible_notifications<'a>(notifications: &'a [Notification], viewer: &Viewer) -> Vec<&'a Notification> {
    let mut visible: Vec<&Notification> = notifications.iter().filter(|n| viewer.can_see(n)).collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

/// Ids of the unread notifications that opening `view` for `bucket` clears
pub fn select_for_view(
    notifications: &[Notification],
    viewer: &Viewer,
    view: NotificationView,
    bucket: NotificationBucket,
) -> Vec<Uuid> {
    notifications
        .iter()
        .filter(|n| !n.is_read && viewer.can_see(n) && n.matches_view(view, bucket))
        .map(|n| n.id)
        .collect()
}

/// Apply a read-for-view transition in place, returning the ids it changed
pub fn mark_read_for_view(
    notifications: &mut [Notification],
    viewer: &Viewer,
    view: NotificationView,
    bucket: NotificationBucket,
) -> Vec<Uuid> {
    notifications
        .iter_mut()
        .filter(|n| !n.is_read && viewer.can_see(n) && n.matches_view(view, bucket))
        .map(|n| {
            n.is_read = true;
            n.id
        })
        .collect()
}
