//! REST client against wiremock.

use crate::common::{init_logging, local_config, unsigned_token};
use iot_ws_harness::page::{PageLink, SortOrder, TimePageLink, drain, drain_time};
use iot_ws_harness::{HarnessConfig, HarnessError, RestClient};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "tenant@thingsboard.org";

async fn logged_in(server: &MockServer) -> RestClient {
    let token = unsigned_token(TENANT);
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": TENANT, "password": "tenant"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": token, "refreshToken": "refresh-1"})),
        )
        .mount(server)
        .await;

    let mut client = RestClient::new(&local_config(&server.uri())).unwrap();
    client.login(TENANT, "tenant").await.unwrap();
    client
}

fn device_page(page: usize, page_size: usize, total: usize) -> Value {
    let start = page * page_size;
    let end = usize::min(start + page_size, total);
    let data: Vec<Value> = (start..end)
        .map(|i| json!({"name": format!("Device {:03}", i)}))
        .collect();
    json!({
        "data": data,
        "totalPages": total.div_ceil(page_size),
        "totalElements": total,
        "hasNext": end < total
    })
}

#[tokio::test]
async fn test_login_stores_tokens() {
    init_logging();
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    assert_eq!(client.token(), Some(unsigned_token(TENANT).as_str()));
    assert_eq!(client.tokens().unwrap().refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_login_rejects_foreign_subject() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": unsigned_token("customer@thingsboard.org"),
            "refreshToken": "r"
        })))
        .mount(&server)
        .await;

    let mut client = RestClient::new(&local_config(&server.uri())).unwrap();
    let error = client.login(TENANT, "tenant").await.unwrap_err();
    assert!(matches!(error, HarnessError::InvalidToken { .. }));
    assert!(client.token().is_none());
}

#[tokio::test]
async fn test_bad_credentials() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid username or password"))
        .mount(&server)
        .await;

    let mut client = RestClient::new(&local_config(&server.uri())).unwrap();
    let error = client.login(TENANT, "wrong").await.unwrap_err();
    assert!(matches!(error, HarnessError::Authentication { status: 401, .. }));
}

#[tokio::test]
async fn test_refresh_token() {
    init_logging();
    let server = MockServer::start().await;
    let mut client = logged_in(&server).await;

    let refreshed = unsigned_token(TENANT) + "x";
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": refreshed, "refreshToken": "refresh-2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.refresh_token().await.unwrap();
    assert_eq!(client.token(), Some(refreshed.as_str()));
    assert_eq!(client.tokens().unwrap().refresh_token, "refresh-2");
}

#[tokio::test]
async fn test_refresh_without_session() {
    let server = MockServer::start().await;
    let mut client = RestClient::new(&local_config(&server.uri())).unwrap();
    let error = client.refresh_token().await.unwrap_err();
    assert!(matches!(error, HarnessError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_page_request_parameters() {
    init_logging();
    let server = MockServer::start().await;
    let client = logged_in(&server).await;
    let bearer = format!("Bearer {}", unsigned_token(TENANT));

    Mock::given(method("GET"))
        .and(path("/api/tenant/devices"))
        .and(header("X-Authorization", bearer.as_str()))
        .and(query_param("pageSize", "23"))
        .and(query_param("page", "0"))
        .and(query_param("textSearch", "Device"))
        .and(query_param("sortProperty", "name"))
        .and(query_param("sortOrder", "ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(0, 23, 5)))
        .expect(1)
        .mount(&server)
        .await;

    let link = PageLink::new(23)
        .unwrap()
        .with_text_search("Device")
        .with_sort_order(SortOrder::asc("name"));
    let page = client
        .get_page::<Value>("/api/tenant/devices", &link)
        .await
        .unwrap();
    assert_eq!(page.len(), 5);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_drain_rest_endpoint() {
    init_logging();
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    for page in 0..8 {
        Mock::given(method("GET"))
            .and(path("/api/tenant/devices"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(device_page(page, 23, 178)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let devices: Vec<Value> = drain(
        &client.page_source("/api/tenant/devices"),
        PageLink::new(23).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(devices.len(), 178);
    assert_eq!(devices[0]["name"], "Device 000");
    assert_eq!(devices[177]["name"], "Device 177");
}

#[tokio::test]
async fn test_drain_time_endpoint() {
    init_logging();
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/alarm/DEVICE/abc"))
        .and(query_param("startTime", "1000"))
        .and(query_param("endTime", "2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(0, 10, 3)))
        .mount(&server)
        .await;

    let first = TimePageLink::new(10)
        .unwrap()
        .with_time_range(1_000, 2_000)
        .unwrap();
    let alarms: Vec<Value> = drain_time(first, |link| {
        let client = &client;
        async move { client.get_time_page("/api/alarm/DEVICE/abc", &link).await }
    })
    .await
    .unwrap();
    assert_eq!(alarms.len(), 3);
}

#[tokio::test]
async fn test_server_error_aborts_drain() {
    init_logging();
    let server = MockServer::start().await;
    let client = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/tenant/devices"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(0, 10, 30)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/devices"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result: Result<Vec<Value>, _> = drain(
        &client.page_source("/api/tenant/devices"),
        PageLink::new(10).unwrap(),
    )
    .await;
    assert!(matches!(result, Err(HarnessError::Http { status: 500, .. })));
}

#[tokio::test]
async fn test_logout_clears_session() {
    init_logging();
    let server = MockServer::start().await;
    let mut client = logged_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();
    assert!(client.token().is_none());
    client.logout().await.unwrap();
}

#[tokio::test]
async fn test_get_all_uses_configured_page_size() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": unsigned_token(TENANT),
            "refreshToken": "r"
        })))
        .mount(&server)
        .await;
    for page in 0..8 {
        Mock::given(method("GET"))
            .and(path("/api/tenant/devices"))
            .and(query_param("pageSize", "23"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(device_page(page, 23, 178)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = HarnessConfig::builder()
        .with_base_url(server.uri())
        .with_default_page_size(23)
        .build()
        .unwrap();
    let mut client = RestClient::new(&config).unwrap();
    client.login(TENANT, "tenant").await.unwrap();

    let devices: Vec<Value> = client.get_all("/api/tenant/devices").await.unwrap();
    assert_eq!(devices.len(), 178);
    assert_eq!(devices[177]["name"], "Device 177");
}
