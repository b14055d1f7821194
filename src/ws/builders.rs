//! Typed command builders and the matching send-and-wait helpers.
//!
//! All builders use [`CMD_ID`]. The protocol multiplexes by `cmdId`, but one
//! subscription per connection is enough for a test: follow-up commands such
//! as [`latest_cmd`] amend the subscription opened under the same id.
//! [`WsClient::send`] accepts any id for tests that need more.

use super::client::WsClient;
use crate::codec::{
    self, Aggregation, AlarmCountCmd, AlarmCountQuery, AlarmCountUpdate, AlarmSeverity,
    AlarmStatusCmd, AlarmStatusUpdate, AttributeScope, AttributesSubscriptionCmd, EntityCountCmd,
    EntityCountQuery, EntityCountUpdate, EntityDataCmd, EntityDataPageLink, EntityDataQuery,
    EntityDataUpdate, EntityFilter, EntityHistoryCmd, EntityId, EntityKey, KeyFilter,
    LatestValueCmd, MarkAllNotificationsAsReadCmd, MarkNotificationsAsReadCmd,
    TelemetrySubscriptionUpdate, TimeSeriesCmd, TimeseriesSubscriptionCmd,
    UnreadNotificationsCmd, UnreadNotificationsCountCmd, UnreadNotificationsCountUpdate,
    UnreadNotificationsUpdate, UnsubscribeCmd, WsCmd,
};
use uuid::Uuid;
use crate::error::HarnessResult;

/// Command id used by every builder.
pub const CMD_ID: i32 = 1;

/// Maximum points requested by history and time-series commands.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

pub fn entity_count_cmd(filter: EntityFilter, key_filters: Vec<KeyFilter>) -> EntityCountCmd {
    EntityCountCmd {
        cmd_id: CMD_ID,
        query: EntityCountQuery::new(filter).with_key_filters(key_filters),
    }
}

pub fn alarm_count_cmd(query: AlarmCountQuery) -> AlarmCountCmd {
    AlarmCountCmd {
        cmd_id: CMD_ID,
        query,
    }
}

/// Entity-data query with the given page link and latest-value keys.
pub fn entity_data_query_cmd(
    filter: EntityFilter,
    page_link: EntityDataPageLink,
    latest_values: Vec<EntityKey>,
) -> EntityDataCmd {
    let query = EntityDataQuery::new(filter, page_link).with_latest_values(latest_values);
    EntityDataCmd::new(CMD_ID).with_query(query)
}

/// History of `keys` over `[now - time_window, now]` for the first entity
/// matching `filter`. Times are epoch milliseconds.
pub fn history_cmd(
    keys: &[&str],
    now: i64,
    time_window: i64,
    filter: EntityFilter,
    agg: Aggregation,
) -> EntityDataCmd {
    let history = EntityHistoryCmd {
        keys: keys.iter().map(|key| key.to_string()).collect(),
        start_ts: now - time_window,
        end_ts: now,
        interval: 0,
        limit: DEFAULT_HISTORY_LIMIT,
        agg,
        fetch_latest_previous_point: false,
    };
    EntityDataCmd::new(CMD_ID)
        .with_query(EntityDataQuery::new(filter, EntityDataPageLink::new(1, 0)))
        .with_history(history)
}

/// Latest-value subscription amending the subscription under [`CMD_ID`].
pub fn latest_cmd(keys: Vec<EntityKey>) -> EntityDataCmd {
    EntityDataCmd::new(CMD_ID).with_latest(LatestValueCmd { keys })
}

/// Rolling time-series subscription starting at `now - time_window`.
pub fn ts_cmd(keys: &[&str], now: i64, time_window: i64) -> EntityDataCmd {
    EntityDataCmd::new(CMD_ID).with_ts(TimeSeriesCmd {
        keys: keys.iter().map(|key| key.to_string()).collect(),
        start_ts: now - time_window,
        time_window,
        interval: 0,
        limit: DEFAULT_HISTORY_LIMIT,
        agg: Aggregation::None,
        fetch_latest_previous_point: false,
    })
}

pub fn attributes_subscription_cmd(
    entity_id: EntityId,
    keys: &[&str],
    scope: Option<AttributeScope>,
) -> AttributesSubscriptionCmd {
    AttributesSubscriptionCmd {
        scope,
        ..AttributesSubscriptionCmd::new(CMD_ID, entity_id, keys)
    }
}

pub fn timeseries_subscription_cmd(
    entity_id: EntityId,
    keys: &[&str],
    start_ts: i64,
    time_window: i64,
) -> TimeseriesSubscriptionCmd {
    TimeseriesSubscriptionCmd {
        start_ts,
        time_window,
        limit: DEFAULT_HISTORY_LIMIT,
        ..TimeseriesSubscriptionCmd::new(CMD_ID, entity_id, keys)
    }
}

/// Active-alarm status of `originator`, restricted to `types` and
/// `severities` when they are not empty.
pub fn alarm_status_cmd(
    originator: EntityId,
    types: &[&str],
    severities: Vec<AlarmSeverity>,
) -> AlarmStatusCmd {
    AlarmStatusCmd::new(CMD_ID, originator, types, severities)
}

pub fn unread_notifications_count_cmd() -> UnreadNotificationsCountCmd {
    UnreadNotificationsCountCmd { cmd_id: CMD_ID }
}

pub fn unread_notifications_cmd(limit: usize) -> UnreadNotificationsCmd {
    UnreadNotificationsCmd {
        cmd_id: CMD_ID,
        limit,
    }
}

pub fn mark_notifications_as_read_cmd(notifications: &[Uuid]) -> MarkNotificationsAsReadCmd {
    MarkNotificationsAsReadCmd {
        cmd_id: CMD_ID,
        notifications: notifications.to_vec(),
    }
}

pub fn mark_all_notifications_as_read_cmd() -> MarkAllNotificationsAsReadCmd {
    MarkAllNotificationsAsReadCmd { cmd_id: CMD_ID }
}

pub fn unsubscribe_entity_data_cmd() -> WsCmd {
    WsCmd::EntityDataUnsubscribe(UnsubscribeCmd { cmd_id: CMD_ID })
}

pub fn unsubscribe_count_cmd() -> WsCmd {
    WsCmd::EntityCountUnsubscribe(UnsubscribeCmd { cmd_id: CMD_ID })
}

pub fn unsubscribe_alarm_count_cmd() -> WsCmd {
    WsCmd::AlarmCountUnsubscribe(UnsubscribeCmd { cmd_id: CMD_ID })
}

pub fn unsubscribe_alarm_status_cmd() -> WsCmd {
    WsCmd::AlarmStatusUnsubscribe(UnsubscribeCmd { cmd_id: CMD_ID })
}

pub fn unsubscribe_notifications_cmd() -> WsCmd {
    WsCmd::NotificationsUnsubscribe(UnsubscribeCmd { cmd_id: CMD_ID })
}

pub fn parse_count_reply(text: &str) -> HarnessResult<EntityCountUpdate> {
    codec::decode(text)
}

pub fn parse_alarm_count_reply(text: &str) -> HarnessResult<AlarmCountUpdate> {
    codec::decode(text)
}

pub fn parse_data_reply(text: &str) -> HarnessResult<EntityDataUpdate> {
    codec::decode(text)
}

pub fn parse_telemetry_reply(text: &str) -> HarnessResult<TelemetrySubscriptionUpdate> {
    codec::decode(text)
}

pub fn parse_alarm_status_reply(text: &str) -> HarnessResult<AlarmStatusUpdate> {
    codec::decode(text)
}

pub fn parse_notifications_count_reply(
    text: &str,
) -> HarnessResult<UnreadNotificationsCountUpdate> {
    codec::decode(text)
}

pub fn parse_notifications_reply(text: &str) -> HarnessResult<UnreadNotificationsUpdate> {
    codec::decode(text)
}

impl WsClient {
    /// Subscribe to the count of entities matching `filter` and return the
    /// initial count.
    pub async fn send_entity_count(
        &self,
        filter: EntityFilter,
        key_filters: Vec<KeyFilter>,
    ) -> HarnessResult<EntityCountUpdate> {
        self.send_cmd(entity_count_cmd(filter, key_filters)).await?;
        parse_count_reply(&self.wait_for_reply().await?)
    }

    pub async fn send_alarm_count(
        &self,
        query: AlarmCountQuery,
    ) -> HarnessResult<AlarmCountUpdate> {
        self.send_cmd(alarm_count_cmd(query)).await?;
        parse_alarm_count_reply(&self.wait_for_reply().await?)
    }

    /// Query the first entity matching `filter`.
    pub async fn send_entity_data_query(
        &self,
        filter: EntityFilter,
    ) -> HarnessResult<EntityDataUpdate> {
        self.send_cmd(entity_data_query_cmd(
            filter,
            EntityDataPageLink::new(1, 0),
            Vec::new(),
        ))
        .await?;
        parse_data_reply(&self.wait_for_reply().await?)
    }

    pub async fn send_history_cmd(
        &self,
        keys: &[&str],
        now: i64,
        time_window: i64,
        filter: EntityFilter,
    ) -> HarnessResult<EntityDataUpdate> {
        self.send_cmd(history_cmd(keys, now, time_window, filter, Aggregation::None))
            .await?;
        parse_data_reply(&self.wait_for_reply().await?)
    }

    /// Open a query on `filter` with latest-value keys and return the first
    /// page of data.
    pub async fn subscribe_latest_update(
        &self,
        keys: Vec<EntityKey>,
        filter: EntityFilter,
    ) -> HarnessResult<EntityDataUpdate> {
        let cmd = entity_data_query_cmd(filter, EntityDataPageLink::new(1, 0), Vec::new())
            .with_latest(LatestValueCmd { keys });
        self.send_cmd(cmd).await?;
        parse_data_reply(&self.wait_for_reply().await?)
    }

    pub async fn subscribe_ts_update(
        &self,
        keys: &[&str],
        now: i64,
        time_window: i64,
        filter: EntityFilter,
    ) -> HarnessResult<EntityDataUpdate> {
        let mut cmd = ts_cmd(keys, now, time_window);
        cmd.query = Some(EntityDataQuery::new(filter, EntityDataPageLink::new(1, 0)));
        self.send_cmd(cmd).await?;
        parse_data_reply(&self.wait_for_reply().await?)
    }

    pub async fn subscribe_attributes(
        &self,
        entity_id: EntityId,
        keys: &[&str],
        scope: Option<AttributeScope>,
    ) -> HarnessResult<TelemetrySubscriptionUpdate> {
        self.send_cmd(attributes_subscription_cmd(entity_id, keys, scope))
            .await?;
        parse_telemetry_reply(&self.wait_for_reply().await?)
    }

    pub async fn subscribe_timeseries(
        &self,
        entity_id: EntityId,
        keys: &[&str],
        start_ts: i64,
        time_window: i64,
    ) -> HarnessResult<TelemetrySubscriptionUpdate> {
        self.send_cmd(timeseries_subscription_cmd(
            entity_id,
            keys,
            start_ts,
            time_window,
        ))
        .await?;
        parse_telemetry_reply(&self.wait_for_reply().await?)
    }

    /// Subscribe to the active-alarm status of `originator` and return the
    /// initial status.
    pub async fn subscribe_alarm_status(
        &self,
        originator: EntityId,
        types: &[&str],
        severities: Vec<AlarmSeverity>,
    ) -> HarnessResult<AlarmStatusUpdate> {
        self.send_cmd(alarm_status_cmd(originator, types, severities))
            .await?;
        parse_alarm_status_reply(&self.wait_for_reply().await?)
    }

    pub async fn subscribe_unread_notifications_count(
        &self,
    ) -> HarnessResult<UnreadNotificationsCountUpdate> {
        self.send_cmd(unread_notifications_count_cmd()).await?;
        parse_notifications_count_reply(&self.wait_for_reply().await?)
    }

    /// Subscribe to the `limit` most recent unread notifications and return
    /// the initial list.
    pub async fn subscribe_unread_notifications(
        &self,
        limit: usize,
    ) -> HarnessResult<UnreadNotificationsUpdate> {
        self.send_cmd(unread_notifications_cmd(limit)).await?;
        parse_notifications_reply(&self.wait_for_reply().await?)
    }

    /// Mark notifications as read. Returns once the frame is written; the
    /// effect shows up as updates on the notification subscriptions.
    pub async fn mark_notifications_as_read(&self, notifications: &[Uuid]) -> HarnessResult<()> {
        self.send_cmd(mark_notifications_as_read_cmd(notifications))
            .await
    }

    pub async fn mark_all_notifications_as_read(&self) -> HarnessResult<()> {
        self.send_cmd(mark_all_notifications_as_read_cmd()).await
    }
}
