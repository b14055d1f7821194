//! Wire codec for the telemetry WebSocket protocol.
//!
//! The protocol is JSON text frames in both directions and is not
//! self-describing: a reply does not say which type it is, so the caller names
//! the target type when decoding. [`decode_header`] is the one exception, a
//! lenient peek at the correlation fields every reply shares.
//!
//! # Example Usage
//!
//! ```rust
//! use iot_ws_harness::codec::{self, EntityCountUpdate};
//!
//! let reply: EntityCountUpdate = codec::decode(r#"{"cmdId":1,"count":101}"#).unwrap();
//! assert_eq!(reply.count, 101);
//!
//! let header = codec::decode_header(r#"{"cmdId":1,"count":101}"#).unwrap();
//! assert_eq!(header.correlation_id(), Some(1));
//! ```

pub mod commands;
pub mod query;
pub mod updates;

pub use commands::{
    AlarmCountCmd, AlarmStatusCmd, AttributesSubscriptionCmd, AuthCmd, EntityCountCmd,
    EntityDataCmd, EntityHistoryCmd, LatestValueCmd, MarkAllNotificationsAsReadCmd,
    MarkNotificationsAsReadCmd, TimeSeriesCmd, TimeseriesSubscriptionCmd,
    UnreadNotificationsCmd, UnreadNotificationsCountCmd, UnsubscribeCmd, WsCmd,
    WsCommandsWrapper,
};
pub use query::{
    Aggregation, AlarmCountQuery, AlarmSearchStatus, AlarmSeverity, AttributeScope,
    EntityCountQuery, EntityDataPageLink, EntityDataQuery, EntityDataSortOrder, EntityFilter,
    EntityId, EntityKey, EntityKeyType, EntityType, KeyFilter,
};
pub use updates::{
    AlarmCountUpdate, AlarmStatusUpdate, CmdUpdateType, EntityCountUpdate, EntityData,
    EntityDataUpdate, Notification, NotificationStatus, TelemetrySubscriptionUpdate, TsValue,
    UnreadNotificationsCountUpdate, UnreadNotificationsUpdate,
};

use crate::error::{HarnessError, HarnessResult};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode an outbound value as a text frame.
pub fn encode<T: Serialize>(command: &T) -> HarnessResult<String> {
    Ok(serde_json::to_string(command)?)
}

/// Decode a text frame as `T`.
///
/// # Errors
///
/// Returns [`HarnessError::Deserialization`] naming `T` when the payload does
/// not have the expected shape.
pub fn decode<T: DeserializeOwned>(text: &str) -> HarnessResult<T> {
    serde_json::from_str(text).map_err(|source| HarnessError::Deserialization {
        target: std::any::type_name::<T>(),
        source,
    })
}

/// Correlation fields shared by every reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyHeader {
    #[serde(default)]
    pub cmd_id: Option<i32>,
    #[serde(default)]
    pub subscription_id: Option<i32>,
    #[serde(default)]
    pub cmd_update_type: Option<CmdUpdateType>,
}

impl ReplyHeader {
    /// The command id this message answers. Entity commands echo `cmdId`;
    /// per-entity subscriptions echo it as `subscriptionId`.
    pub fn correlation_id(&self) -> Option<i32> {
        self.cmd_id.or(self.subscription_id)
    }
}

/// Peek at the correlation fields. Returns `None` for anything that is not a
/// JSON object.
pub fn decode_header(text: &str) -> Option<ReplyHeader> {
    serde_json::from_str::<ReplyHeader>(text).ok()
}
