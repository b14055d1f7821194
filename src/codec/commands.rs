//! Outbound WebSocket commands.
//!
//! Every frame the client sends is a [`WsCommandsWrapper`]: an optional
//! `authCmd` followed by a list of `type`-tagged commands. Each command carries
//! a client-chosen `cmdId` that the server echoes on every reply and update.

use super::query::{
    Aggregation, AlarmCountQuery, AlarmSeverity, AttributeScope, EntityCountQuery,
    EntityDataQuery, EntityId, EntityKey,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authentication handshake sent as the first frame when the token is not
/// carried in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCmd {
    pub cmd_id: i32,
    pub token: String,
}

impl AuthCmd {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            cmd_id: 0,
            token: token.into(),
        }
    }
}

/// Historical time-series read attached to an entity-data command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHistoryCmd {
    pub keys: Vec<String>,
    pub start_ts: i64,
    pub end_ts: i64,
    #[serde(default)]
    pub interval: i64,
    pub limit: usize,
    #[serde(default)]
    pub agg: Aggregation,
    #[serde(default)]
    pub fetch_latest_previous_point: bool,
}

/// Subscription to the latest value of each key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestValueCmd {
    pub keys: Vec<EntityKey>,
}

/// Rolling time-series subscription over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesCmd {
    pub keys: Vec<String>,
    pub start_ts: i64,
    pub time_window: i64,
    #[serde(default)]
    pub interval: i64,
    pub limit: usize,
    #[serde(default)]
    pub agg: Aggregation,
    #[serde(default)]
    pub fetch_latest_previous_point: bool,
}

/// Entity-data command: a query plus any of history, latest or time-series
/// sub-commands. A follow-up command with the same id and no query amends the
/// existing subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDataCmd {
    pub cmd_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<EntityDataQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_cmd: Option<EntityHistoryCmd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_cmd: Option<LatestValueCmd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_cmd: Option<TimeSeriesCmd>,
}

impl EntityDataCmd {
    pub fn new(cmd_id: i32) -> Self {
        Self {
            cmd_id,
            query: None,
            history_cmd: None,
            latest_cmd: None,
            ts_cmd: None,
        }
    }

    pub fn with_query(mut self, query: EntityDataQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_history(mut self, history_cmd: EntityHistoryCmd) -> Self {
        self.history_cmd = Some(history_cmd);
        self
    }

    pub fn with_latest(mut self, latest_cmd: LatestValueCmd) -> Self {
        self.latest_cmd = Some(latest_cmd);
        self
    }

    pub fn with_ts(mut self, ts_cmd: TimeSeriesCmd) -> Self {
        self.ts_cmd = Some(ts_cmd);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCountCmd {
    pub cmd_id: i32,
    pub query: EntityCountQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmCountCmd {
    pub cmd_id: i32,
    pub query: AlarmCountQuery,
}

/// Attribute subscription on a single entity. `keys` is comma-separated;
/// an empty list subscribes to every key in the scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesSubscriptionCmd {
    pub cmd_id: i32,
    pub entity_type: super::query::EntityType,
    pub entity_id: uuid::Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keys: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<AttributeScope>,
    #[serde(default)]
    pub unsubscribe: bool,
}

impl AttributesSubscriptionCmd {
    pub fn new(cmd_id: i32, entity: EntityId, keys: &[&str]) -> Self {
        Self {
            cmd_id,
            entity_type: entity.entity_type,
            entity_id: entity.id,
            keys: keys.join(","),
            scope: None,
            unsubscribe: false,
        }
    }
}

/// Time-series subscription on a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesSubscriptionCmd {
    pub cmd_id: i32,
    pub entity_type: super::query::EntityType,
    pub entity_id: uuid::Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keys: String,
    #[serde(default)]
    pub start_ts: i64,
    #[serde(default)]
    pub time_window: i64,
    #[serde(default)]
    pub interval: i64,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub agg: Aggregation,
    #[serde(default)]
    pub unsubscribe: bool,
}

impl TimeseriesSubscriptionCmd {
    pub fn new(cmd_id: i32, entity: EntityId, keys: &[&str]) -> Self {
        Self {
            cmd_id,
            entity_type: entity.entity_type,
            entity_id: entity.id,
            keys: keys.join(","),
            start_ts: 0,
            time_window: 0,
            interval: 0,
            limit: 0,
            agg: Aggregation::None,
            unsubscribe: false,
        }
    }
}

/// Subscription to whether `originator` has any active alarm of the listed
/// types and severities. Empty lists match every type or severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmStatusCmd {
    pub cmd_id: i32,
    pub originator_id: EntityId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_list: Vec<AlarmSeverity>,
}

impl AlarmStatusCmd {
    pub fn new(
        cmd_id: i32,
        originator_id: EntityId,
        types: &[&str],
        severities: Vec<AlarmSeverity>,
    ) -> Self {
        Self {
            cmd_id,
            originator_id,
            type_list: types.iter().map(|t| t.to_string()).collect(),
            severity_list: severities,
        }
    }
}

/// Subscription to the unread notification count of the session's user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadNotificationsCountCmd {
    pub cmd_id: i32,
}

/// Subscription to the `limit` most recent unread notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadNotificationsCmd {
    pub cmd_id: i32,
    pub limit: usize,
}

/// Mark notifications as read. The server answers through the open
/// notification subscriptions rather than with a reply of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkNotificationsAsReadCmd {
    pub cmd_id: i32,
    pub notifications: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllNotificationsAsReadCmd {
    pub cmd_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeCmd {
    pub cmd_id: i32,
}

/// A single command inside a [`WsCommandsWrapper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WsCmd {
    EntityData(EntityDataCmd),
    EntityCount(EntityCountCmd),
    AlarmCount(AlarmCountCmd),
    Attributes(AttributesSubscriptionCmd),
    Timeseries(TimeseriesSubscriptionCmd),
    AlarmStatus(AlarmStatusCmd),
    NotificationsCount(UnreadNotificationsCountCmd),
    Notifications(UnreadNotificationsCmd),
    MarkNotificationsAsRead(MarkNotificationsAsReadCmd),
    MarkAllNotificationsAsRead(MarkAllNotificationsAsReadCmd),
    EntityDataUnsubscribe(UnsubscribeCmd),
    EntityCountUnsubscribe(UnsubscribeCmd),
    AlarmCountUnsubscribe(UnsubscribeCmd),
    AlarmStatusUnsubscribe(UnsubscribeCmd),
    NotificationsUnsubscribe(UnsubscribeCmd),
}

impl WsCmd {
    /// The id the server will echo on replies to this command.
    pub fn cmd_id(&self) -> i32 {
        match self {
            WsCmd::EntityData(cmd) => cmd.cmd_id,
            WsCmd::EntityCount(cmd) => cmd.cmd_id,
            WsCmd::AlarmCount(cmd) => cmd.cmd_id,
            WsCmd::Attributes(cmd) => cmd.cmd_id,
            WsCmd::Timeseries(cmd) => cmd.cmd_id,
            WsCmd::AlarmStatus(cmd) => cmd.cmd_id,
            WsCmd::NotificationsCount(cmd) => cmd.cmd_id,
            WsCmd::Notifications(cmd) => cmd.cmd_id,
            WsCmd::MarkNotificationsAsRead(cmd) => cmd.cmd_id,
            WsCmd::MarkAllNotificationsAsRead(cmd) => cmd.cmd_id,
            WsCmd::EntityDataUnsubscribe(cmd)
            | WsCmd::EntityCountUnsubscribe(cmd)
            | WsCmd::AlarmCountUnsubscribe(cmd)
            | WsCmd::AlarmStatusUnsubscribe(cmd)
            | WsCmd::NotificationsUnsubscribe(cmd) => cmd.cmd_id,
        }
    }
}

impl From<EntityDataCmd> for WsCmd {
    fn from(cmd: EntityDataCmd) -> Self {
        WsCmd::EntityData(cmd)
    }
}

impl From<EntityCountCmd> for WsCmd {
    fn from(cmd: EntityCountCmd) -> Self {
        WsCmd::EntityCount(cmd)
    }
}

impl From<AlarmCountCmd> for WsCmd {
    fn from(cmd: AlarmCountCmd) -> Self {
        WsCmd::AlarmCount(cmd)
    }
}

impl From<AttributesSubscriptionCmd> for WsCmd {
    fn from(cmd: AttributesSubscriptionCmd) -> Self {
        WsCmd::Attributes(cmd)
    }
}

impl From<TimeseriesSubscriptionCmd> for WsCmd {
    fn from(cmd: TimeseriesSubscriptionCmd) -> Self {
        WsCmd::Timeseries(cmd)
    }
}

impl From<AlarmStatusCmd> for WsCmd {
    fn from(cmd: AlarmStatusCmd) -> Self {
        WsCmd::AlarmStatus(cmd)
    }
}

impl From<UnreadNotificationsCountCmd> for WsCmd {
    fn from(cmd: UnreadNotificationsCountCmd) -> Self {
        WsCmd::NotificationsCount(cmd)
    }
}

impl From<UnreadNotificationsCmd> for WsCmd {
    fn from(cmd: UnreadNotificationsCmd) -> Self {
        WsCmd::Notifications(cmd)
    }
}

impl From<MarkNotificationsAsReadCmd> for WsCmd {
    fn from(cmd: MarkNotificationsAsReadCmd) -> Self {
        WsCmd::MarkNotificationsAsRead(cmd)
    }
}

impl From<MarkAllNotificationsAsReadCmd> for WsCmd {
    fn from(cmd: MarkAllNotificationsAsReadCmd) -> Self {
        WsCmd::MarkAllNotificationsAsRead(cmd)
    }
}

/// Envelope for every outbound frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsCommandsWrapper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_cmd: Option<AuthCmd>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmds: Vec<WsCmd>,
}

impl WsCommandsWrapper {
    /// Wrap a single command.
    pub fn single(cmd: impl Into<WsCmd>) -> Self {
        Self {
            auth_cmd: None,
            cmds: vec![cmd.into()],
        }
    }

    pub fn auth(token: impl Into<String>) -> Self {
        Self {
            auth_cmd: Some(AuthCmd::new(token)),
            cmds: Vec::new(),
        }
    }

    pub fn push(mut self, cmd: impl Into<WsCmd>) -> Self {
        self.cmds.push(cmd.into());
        self
    }

    /// Ids of the carried commands, in order. The auth command is excluded.
    pub fn cmd_ids(&self) -> Vec<i32> {
        self.cmds.iter().map(WsCmd::cmd_id).collect()
    }
}
