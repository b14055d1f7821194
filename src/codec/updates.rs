//! Inbound replies and subscription updates.

use super::query::{EntityId, EntityKeyType};
use crate::page::PageData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of update the server is pushing, when it says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CmdUpdateType {
    EntityData,
    AlarmData,
    CountData,
    AlarmCountData,
    AlarmStatus,
    NotificationsCount,
    Notifications,
    #[serde(other)]
    Unknown,
}

/// A timestamped value. The platform transmits all values as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsValue {
    pub ts: i64,
    pub value: String,
}

impl TsValue {
    pub fn new(ts: i64, value: impl Into<String>) -> Self {
        Self {
            ts,
            value: value.into(),
        }
    }
}

/// Data for one entity inside an entity-data reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub entity_id: EntityId,
    #[serde(default)]
    pub latest: HashMap<EntityKeyType, HashMap<String, TsValue>>,
    #[serde(default)]
    pub timeseries: HashMap<String, Vec<TsValue>>,
}

impl EntityData {
    /// Latest value of `key` under `key_type`.
    pub fn latest_value(&self, key_type: EntityKeyType, key: &str) -> Option<&TsValue> {
        self.latest.get(&key_type).and_then(|values| values.get(key))
    }

    pub fn series(&self, key: &str) -> &[TsValue] {
        self.timeseries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCountUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl EntityCountUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmCountUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl AlarmCountUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}

/// Reply to an entity-data command.
///
/// The initial reply carries `data`, a page of matching entities; later
/// pushes carry `update`, the entities whose values changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDataUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub data: Option<PageData<EntityData>>,
    #[serde(default)]
    pub update: Option<Vec<EntityData>>,
    #[serde(default)]
    pub allowed_entities: i64,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl EntityDataUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }

    /// Entities carried by this reply, whichever form it took.
    pub fn entities(&self) -> &[EntityData] {
        if let Some(page) = &self.data {
            &page.data
        } else {
            self.update.as_deref().unwrap_or(&[])
        }
    }
}

/// Reply and push for an alarm-status subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStatusUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl AlarmStatusUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Sent,
    Read,
    #[serde(other)]
    Unknown,
}

/// A notification delivered to the session's user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntityId,
    #[serde(default)]
    pub created_time: i64,
    #[serde(default)]
    pub recipient_id: Option<EntityId>,
    #[serde(default, rename = "type")]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status: Option<NotificationStatus>,
    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.status == Some(NotificationStatus::Read)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadNotificationsCountUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub total_unread_count: i64,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl UnreadNotificationsCountUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }
}

/// Reply and push for an unread-notifications subscription.
///
/// The initial reply lists the unread notifications in `notifications`; a
/// push carries the one new or changed notification in `update`. Both carry
/// the new total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadNotificationsUpdate {
    pub cmd_id: i32,
    #[serde(default)]
    pub notifications: Option<Vec<Notification>>,
    #[serde(default)]
    pub update: Option<Notification>,
    #[serde(default)]
    pub total_unread_count: i64,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl UnreadNotificationsUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }

    /// Whether this is a push for a single notification.
    pub fn is_partial(&self) -> bool {
        self.update.is_some()
    }
}

/// Update for a per-entity attribute or time-series subscription.
///
/// `data` maps each key to `[ts, value]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySubscriptionUpdate {
    pub subscription_id: i32,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, Vec<(i64, String)>>,
}

impl TelemetrySubscriptionUpdate {
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }

    /// Values of `key` as [`TsValue`]s, in transmission order.
    pub fn values(&self, key: &str) -> Vec<TsValue> {
        self.data
            .get(key)
            .map(|pairs| {
                pairs
                    .iter()
                    .map(|(ts, value)| TsValue::new(*ts, value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent value of `key`.
    pub fn latest(&self, key: &str) -> Option<TsValue> {
        self.values(key).into_iter().max_by_key(|value| value.ts)
    }
}
