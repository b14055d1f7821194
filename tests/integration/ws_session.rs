//! Connection lifecycle and reply/update synchronization over a real socket.

use crate::common::{
    MockWsServer, ScriptedReply, count_reply, first_cmd_id, init_logging, local_config,
};
use iot_ws_harness::codec::{
    EntityCountCmd, EntityCountQuery, EntityDataCmd, EntityFilter, EntityType, WsCommandsWrapper,
};
use iot_ws_harness::ws::builders::entity_count_cmd;
use iot_ws_harness::{HarnessConfig, HarnessError, Strictness, WaitOutcome, WsClient};
use std::time::{Duration, Instant};

/// Answers every counted command with its own id and a count of 101.
async fn counting_server() -> MockWsServer {
    MockWsServer::start(|frame| match first_cmd_id(frame) {
        Some(id) => vec![ScriptedReply::now(count_reply(id as i32, 101))],
        None => Vec::new(),
    })
    .await
}

fn count_cmd(cmd_id: i32) -> EntityCountCmd {
    EntityCountCmd {
        cmd_id,
        query: EntityCountQuery::new(EntityFilter::of_type(EntityType::Tenant)),
    }
}

#[tokio::test]
async fn test_tenant_count_reply() {
    init_logging();
    let server = counting_server().await;
    let config = local_config(&server.base_url());

    let client = WsClient::connect(&config, Some("jwt-token")).await.unwrap();
    let reply = client
        .send_entity_count(EntityFilter::of_type(EntityType::Tenant), Vec::new())
        .await
        .unwrap();

    assert_eq!(reply.cmd_id, 1);
    assert_eq!(reply.count, 101);
    assert!(!reply.is_error());

    let frames = server.frames();
    let sent: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
    assert_eq!(sent["cmds"][0]["type"], "ENTITY_COUNT");
    assert_eq!(sent["cmds"][0]["query"]["entityFilter"]["entityType"], "TENANT");
    client.close().await;
}

#[tokio::test]
async fn test_auth_frame_is_sent_first() {
    init_logging();
    let server = counting_server().await;
    let config = local_config(&server.base_url());

    let client = WsClient::connect(&config, Some("jwt-token")).await.unwrap();
    client.send_cmd(entity_count_cmd(EntityFilter::of_type(EntityType::Device), Vec::new()))
        .await
        .unwrap();

    let frames = server.wait_for_frames(2).await;
    let auth: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(auth["authCmd"]["token"], "jwt-token");
    assert_eq!(auth["authCmd"]["cmdId"], 0);
    assert!(frames[1].contains("ENTITY_COUNT"));
    assert!(!server.request_uris()[0].contains("token="));
}

#[tokio::test]
async fn test_token_in_url_skips_auth_frame() {
    init_logging();
    let server = counting_server().await;
    let config = HarnessConfig::builder()
        .with_base_url(server.base_url())
        .with_token_in_url(true)
        .with_reply_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let client = WsClient::connect(&config, Some("jwt-token")).await.unwrap();
    client.send_cmd(count_cmd(1)).await.unwrap();
    client.wait_for_reply().await.unwrap();

    assert_eq!(server.request_uris(), vec!["/api/ws?token=jwt-token".to_string()]);
    let frames = server.frames();
    assert_eq!(frames.len(), 1);
    assert!(!frames[0].contains("authCmd"));
}

#[tokio::test]
async fn test_one_message_satisfies_reply_and_update() {
    init_logging();
    let server = counting_server().await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    client.register_wait_for_update(1).unwrap();
    client.send_cmd(count_cmd(1)).await.unwrap();

    let reply = client.wait_for_reply().await.unwrap();
    let update = client.wait_for_update().await.unwrap();
    assert_eq!(reply, update);
    assert_eq!(client.last_message(), Some(reply));
}

#[tokio::test]
async fn test_late_reply_does_not_satisfy_newer_send() {
    init_logging();
    let server = MockWsServer::start(|frame| match first_cmd_id(frame) {
        Some(1) => vec![ScriptedReply::after(
            Duration::from_millis(150),
            count_reply(1, 1),
        )],
        Some(2) => vec![ScriptedReply::after(
            Duration::from_millis(400),
            count_reply(2, 2),
        )],
        _ => Vec::new(),
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    client.send_cmd(count_cmd(1)).await.unwrap();
    client.send_cmd(count_cmd(2)).await.unwrap();

    let reply = client.wait_for_reply().await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(parsed["cmdId"], 2);
    assert_eq!(parsed["count"], 2);
}

#[tokio::test]
async fn test_lenient_timeout_waits_full_deadline() {
    init_logging();
    let server = MockWsServer::silent().await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();
    client.send_cmd(count_cmd(1)).await.unwrap();

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let outcome = client
        .wait_for_reply_with(timeout, Strictness::Lenient)
        .await
        .unwrap();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(started.elapsed() >= timeout);
}

#[tokio::test]
async fn test_strict_timeout_raises() {
    init_logging();
    let server = MockWsServer::silent().await;
    let config = HarnessConfig::builder()
        .with_base_url(server.base_url())
        .with_reply_timeout(Duration::from_millis(100))
        .with_update_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = WsClient::connect(&config, None).await.unwrap();

    client.send_cmd(count_cmd(1)).await.unwrap();
    let error = client.wait_for_reply().await.unwrap_err();
    assert!(error.is_timeout());

    client.register_wait_for_update(2).unwrap();
    let error = client
        .wait_for_update_with(Duration::from_millis(50), Strictness::Strict)
        .await
        .unwrap_err();
    assert!(matches!(error, HarnessError::Timeout { operation: "update", .. }));
}

#[tokio::test]
async fn test_update_count_across_pushes() {
    init_logging();
    let server = MockWsServer::start(|frame| {
        if frame.contains("ENTITY_DATA") {
            (1..=3)
                .map(|i| {
                    ScriptedReply::after(
                        Duration::from_millis(20 * i),
                        format!(r#"{{"cmdId":1,"update":[],"seq":{}}}"#, i),
                    )
                })
                .collect()
        } else {
            Vec::new()
        }
    })
    .await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();

    client.register_wait_for_update(3).unwrap();
    client
        .send(&WsCommandsWrapper::single(EntityDataCmd::new(1)))
        .await
        .unwrap();

    let reply = client.wait_for_reply().await.unwrap();
    assert!(reply.contains(r#""seq":1"#));
    let update = client.wait_for_update().await.unwrap();
    assert!(update.contains(r#""seq":3"#));
}

#[tokio::test]
async fn test_server_close_fails_waiter_fast() {
    init_logging();
    let server = MockWsServer::silent().await;
    let config = HarnessConfig::builder()
        .with_base_url(server.base_url())
        .with_reply_timeout(Duration::from_secs(30))
        .build()
        .unwrap();
    let client = WsClient::connect(&config, None).await.unwrap();

    client.send_cmd(count_cmd(1)).await.unwrap();
    server.wait_for_frames(1).await;
    server.close_all();

    let started = Instant::now();
    let error = client.wait_for_reply().await.unwrap_err();
    assert!(error.is_connection(), "unexpected error: {error:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!client.is_connected());

    let error = client.send_cmd(count_cmd(2)).await.unwrap_err();
    assert!(error.is_connection());
}

#[tokio::test]
async fn test_connect_refused() {
    init_logging();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = local_config(&format!("http://{}", addr));
    let error = WsClient::connect(&config, None).await.unwrap_err();
    assert!(error.is_connection());
}

#[tokio::test]
async fn test_close_by_client() {
    init_logging();
    let server = counting_server().await;
    let client = WsClient::connect(&local_config(&server.base_url()), None)
        .await
        .unwrap();
    assert!(client.is_connected());
    assert_eq!(server.connection_count(), 1);

    client.close().await;
    assert!(!client.is_connected());
    assert!(client.send_cmd(count_cmd(1)).await.unwrap_err().is_connection());
}
