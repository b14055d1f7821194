//! Typed command helpers against a scripted server.

use crate::common::{MockWsServer, ScriptedReply, init_logging, local_config};
use iot_ws_harness::codec::{
    AlarmCountQuery, AlarmSeverity, AlarmStatusUpdate, EntityFilter, EntityId, EntityKey,
    EntityKeyType, EntityType, TelemetrySubscriptionUpdate, TsValue, UnreadNotificationsUpdate,
};
use iot_ws_harness::ws::builders::parse_notifications_reply;
use iot_ws_harness::{HarnessError, WsClient};
use serde_json::{Value, json};

fn entity_data_reply(entity: EntityId) -> String {
    json!({
        "cmdId": 1,
        "data": {
            "data": [{
                "entityId": {"entityType": "DEVICE", "id": entity.id},
                "latest": {"TIME_SERIES": {"temperature": {"ts": 1_000, "value": "42.5"}}},
                "timeseries": {"temperature": [
                    {"ts": 1_000, "value": "42.5"},
                    {"ts": 2_000, "value": "43.0"}
                ]}
            }],
            "totalPages": 1,
            "totalElements": 1,
            "hasNext": false
        },
        "update": null,
        "allowedEntities": 1000,
        "errorCode": 0,
        "errorMsg": null,
        "cmdUpdateType": "ENTITY_DATA"
    })
    .to_string()
}

/// Replies to entity-data commands with one device and records the rest.
async fn entity_data_server(entity: EntityId) -> MockWsServer {
    let reply = entity_data_reply(entity);
    MockWsServer::start(move |frame| {
        if frame.contains(r#""type":"ENTITY_DATA""#) {
            vec![ScriptedReply::now(reply.clone())]
        } else {
            Vec::new()
        }
    })
    .await
}

fn sent_cmd(server: &MockWsServer, index: usize) -> Value {
    let frames = server.frames();
    let frame: Value = serde_json::from_str(&frames[index]).unwrap();
    frame["cmds"][0].clone()
}

#[tokio::test]
async fn test_history_cmd() {
    init_logging();
    let device = EntityId::random(EntityType::Device);
    let server = entity_data_server(device).await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    let now = 1_700_000_000_000;
    let update = client
        .send_history_cmd(&["temperature"], now, 3_600_000, EntityFilter::single(device))
        .await
        .unwrap();

    let entity = &update.entities()[0];
    assert_eq!(entity.entity_id, device);
    assert_eq!(entity.series("temperature").len(), 2);

    let cmd = sent_cmd(&server, 0);
    assert_eq!(cmd["cmdId"], 1);
    assert_eq!(cmd["historyCmd"]["startTs"], now - 3_600_000);
    assert_eq!(cmd["historyCmd"]["endTs"], now);
    assert_eq!(cmd["historyCmd"]["limit"], 1000);
    assert_eq!(cmd["historyCmd"]["agg"], "NONE");
    assert_eq!(cmd["query"]["entityFilter"]["type"], "singleEntity");
}

#[tokio::test]
async fn test_latest_subscription() {
    init_logging();
    let device = EntityId::random(EntityType::Device);
    let server = entity_data_server(device).await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    let update = client
        .subscribe_latest_update(
            vec![EntityKey::time_series("temperature")],
            EntityFilter::single(device),
        )
        .await
        .unwrap();

    assert_eq!(
        update.entities()[0].latest_value(EntityKeyType::TimeSeries, "temperature"),
        Some(&TsValue::new(1_000, "42.5"))
    );
    let cmd = sent_cmd(&server, 0);
    assert_eq!(cmd["latestCmd"]["keys"][0]["key"], "temperature");
    assert_eq!(cmd["query"]["pageLink"]["pageSize"], 1);
}

#[tokio::test]
async fn test_ts_subscription_sends_query_and_window() {
    init_logging();
    let device = EntityId::random(EntityType::Device);
    let server = entity_data_server(device).await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    client
        .subscribe_ts_update(&["temperature"], 10_000, 4_000, EntityFilter::single(device))
        .await
        .unwrap();

    let cmd = sent_cmd(&server, 0);
    assert_eq!(cmd["tsCmd"]["startTs"], 6_000);
    assert_eq!(cmd["tsCmd"]["timeWindow"], 4_000);
    assert!(cmd["query"].is_object());
}

#[tokio::test]
async fn test_alarm_count() {
    init_logging();
    let server = MockWsServer::start(|frame| {
        if frame.contains("ALARM_COUNT") {
            vec![ScriptedReply::now(
                json!({"cmdId": 1, "count": 4, "errorCode": 0}).to_string(),
            )]
        } else {
            Vec::new()
        }
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    let reply = client
        .send_alarm_count(AlarmCountQuery::new().with_severities(vec![AlarmSeverity::Critical]))
        .await
        .unwrap();
    assert_eq!(reply.count, 4);
    assert_eq!(sent_cmd(&server, 0)["query"]["severityList"][0], "CRITICAL");
}

#[tokio::test]
async fn test_attribute_subscription() {
    init_logging();
    let server = MockWsServer::start(|frame| {
        if frame.contains(r#""type":"ATTRIBUTES""#) {
            vec![ScriptedReply::now(
                json!({
                    "subscriptionId": 1,
                    "errorCode": 0,
                    "errorMsg": null,
                    "data": {"active": [[1_000, "true"]]}
                })
                .to_string(),
            )]
        } else {
            Vec::new()
        }
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();
    let device = EntityId::random(EntityType::Device);

    let update = client
        .subscribe_attributes(device, &["active"], None)
        .await
        .unwrap();
    assert_eq!(update.latest("active"), Some(TsValue::new(1_000, "true")));
    assert_eq!(sent_cmd(&server, 0)["entityId"], json!(device.id));
}

#[tokio::test]
async fn test_malformed_reply_is_deserialization_error() {
    init_logging();
    let server = MockWsServer::start(|_| {
        vec![ScriptedReply::now(r#"{"cmdId":1,"count":"lots"}"#)]
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    let error = client
        .send_entity_count(EntityFilter::of_type(EntityType::Tenant), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(error, HarnessError::Deserialization { .. }));
}

#[tokio::test]
async fn test_alarm_status_subscription() {
    init_logging();
    let server = MockWsServer::start(|frame| {
        if frame.contains(r#""type":"ALARM_STATUS""#) {
            vec![ScriptedReply::now(
                json!({"cmdId": 1, "active": false, "cmdUpdateType": "ALARM_STATUS"}).to_string(),
            )]
        } else {
            Vec::new()
        }
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();
    let device = EntityId::random(EntityType::Device);

    let initial = client
        .subscribe_alarm_status(
            device,
            &["TEST ALARM", "TEST ALARM 2"],
            vec![AlarmSeverity::Warning],
        )
        .await
        .unwrap();
    assert_eq!(initial.cmd_id, 1);
    assert!(!initial.active);

    let cmd = sent_cmd(&server, 0);
    assert_eq!(cmd["originatorId"]["id"], json!(device.id));
    assert_eq!(cmd["typeList"], json!(["TEST ALARM", "TEST ALARM 2"]));
    assert_eq!(cmd["severityList"], json!(["WARNING"]));

    client.register_wait_for_update(1).unwrap();
    server.broadcast(json!({"cmdId": 1, "active": true}).to_string());
    client.wait_for_update().await.unwrap();

    let pushed: AlarmStatusUpdate = client.last_message_as().unwrap().unwrap();
    assert!(pushed.active);
}

fn notification(id: uuid::Uuid, text: &str) -> Value {
    json!({
        "id": {"entityType": "NOTIFICATION", "id": id},
        "createdTime": 1_700_000_000_000_i64,
        "type": "GENERAL",
        "subject": "Test",
        "text": text,
        "status": "SENT"
    })
}

#[tokio::test]
async fn test_unread_notifications_and_mark_as_read() {
    init_logging();
    let first = uuid::Uuid::new_v4();
    let second = uuid::Uuid::new_v4();
    let full = json!({
        "cmdId": 1,
        "notifications": [notification(second, "Notification 2"), notification(first, "Notification 1")],
        "totalUnreadCount": 2,
        "cmdUpdateType": "NOTIFICATIONS"
    })
    .to_string();
    let after_read = json!({
        "cmdId": 1,
        "update": notification(first, "Notification 1"),
        "totalUnreadCount": 1,
        "cmdUpdateType": "NOTIFICATIONS"
    })
    .to_string();

    let server = MockWsServer::start(move |frame| {
        if frame.contains(r#""type":"NOTIFICATIONS""#) {
            vec![ScriptedReply::now(full.clone())]
        } else if frame.contains("MARK_NOTIFICATIONS_AS_READ") {
            vec![ScriptedReply::now(after_read.clone())]
        } else {
            Vec::new()
        }
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    let initial = client.subscribe_unread_notifications(10).await.unwrap();
    assert_eq!(initial.total_unread_count, 2);
    let texts: Vec<&str> = initial
        .notifications
        .as_deref()
        .unwrap()
        .iter()
        .map(|n| n.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Notification 2", "Notification 1"]);
    assert_eq!(sent_cmd(&server, 0)["limit"], 10);

    client.register_wait_for_update(1).unwrap();
    client.mark_notifications_as_read(&[first]).await.unwrap();
    let pushed = parse_notifications_reply(&client.wait_for_update().await.unwrap()).unwrap();
    assert!(pushed.is_partial());
    assert_eq!(pushed.total_unread_count, 1);
    assert_eq!(pushed.update.unwrap().id.id, first);

    let mark = sent_cmd(&server, 1);
    assert_eq!(mark["type"], "MARK_NOTIFICATIONS_AS_READ");
    assert_eq!(mark["notifications"], json!([first]));

    let last: UnreadNotificationsUpdate = client.last_message_as().unwrap().unwrap();
    assert_eq!(last.total_unread_count, 1);
    let wrong_shape = client.last_message_as::<TelemetrySubscriptionUpdate>();
    assert!(matches!(wrong_shape, Err(HarnessError::Deserialization { .. })));
}

#[tokio::test]
async fn test_last_message_as_before_any_message() {
    init_logging();
    let server = MockWsServer::silent().await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();
    assert!(
        client
            .last_message_as::<UnreadNotificationsUpdate>()
            .unwrap()
            .is_none()
    );
}
