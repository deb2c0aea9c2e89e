use serde::{Deserialize, Serialize};

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Notification;

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationListQuery {
    #[serde(default, alias = "unreadOnly")]
    pub(crate) unread_only: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct NotificationResponse {
    pub(crate) id: String,
    pub(crate) kind: String,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) payload: serde_json::Value,
    pub(crate) is_read: bool,
    pub(crate) created_at: String,
    pub(crate) read_at: Option<String>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            payload: notification.payload.0,
            is_read: notification.is_read,
            created_at: format_primitive(notification.created_at),
            read_at: format_optional(notification.read_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkAllReadResponse {
    pub(crate) updated: u64,
}
