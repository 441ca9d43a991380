use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http_body_util::BodyExt;
use mock_server::{app, app_with_db, Db, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn auth() -> String {
    format!("Basic {}", BASE64.encode(format!("{DEFAULT_USERNAME}:{DEFAULT_PASSWORD}")))
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, auth())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

const CREATE_NETWORK: &str = r#"{"network":{"name":"net-a","zone":"de-fra1","ip_networks":{"ip_network":[{"address":"10.0.0.0/24","dhcp":"yes","family":"IPv4"}]}}}"#;

fn create_server_body(network: Option<&str>) -> String {
    let interface = match network {
        Some(uuid) => format!(r#"{{"type":"private","network":"{uuid}","ip_addresses":{{"ip_address":[{{"family":"IPv4"}}]}}}}"#),
        None => r#"{"type":"public","ip_addresses":{"ip_address":[{"family":"IPv4"}]}}"#.to_string(),
    };
    format!(
        r#"{{"server":{{"zone":"de-fra1","title":"web","hostname":"web.example.com",
        "storage_devices":{{"storage_device":[{{"action":"create","size":10,"title":"root"}}]}},
        "networking":{{"interfaces":{{"interface":[{interface}]}}}}}}}}"#
    )
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/1.3/account").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["error_code"], "AUTHENTICATION_FAILED");
}

#[tokio::test]
async fn account_returns_username() {
    let resp = app().oneshot(request("GET", "/1.3/account", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["account"]["username"], DEFAULT_USERNAME);
}

// --- network ---

#[tokio::test]
async fn list_networks_empty() {
    let resp = app().oneshot(request("GET", "/1.3/network", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["networks"]["network"], serde_json::json!([]));
}

#[tokio::test]
async fn create_network_returns_201() {
    let resp = app().oneshot(request("POST", "/1.3/network", CREATE_NETWORK)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["network"]["name"], "net-a");
    assert_eq!(body["network"]["type"], "private");
    assert_eq!(body["network"]["ip_networks"]["ip_network"][0]["dhcp"], "yes");
}

#[tokio::test]
async fn create_network_unknown_zone_returns_400() {
    let resp = app()
        .oneshot(request("POST", "/1.3/network", r#"{"network":{"name":"n","zone":"mars1"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["error_code"], "ZONE_INVALID");
}

#[tokio::test]
async fn create_network_without_envelope_returns_422() {
    let resp = app()
        .oneshot(request("POST", "/1.3/network", r#"{"name":"n","zone":"de-fra1"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_network_not_found() {
    let resp = app()
        .oneshot(request("GET", "/1.3/network/00000000-0000-0000-0000-000000000000", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["error_code"], "NETWORK_NOT_FOUND");
}

#[tokio::test]
async fn get_server_bad_uuid_returns_400() {
    let resp = app().oneshot(request("GET", "/1.3/server/not-a-uuid", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full lifecycle ---

#[tokio::test]
async fn network_and_server_lifecycle() {
    use tower::Service;

    let db = Db::default();
    let mut app = app_with_db(db.clone()).into_service();

    macro_rules! call {
        ($method:expr, $uri:expr, $body:expr) => {
            ServiceExt::ready(&mut app)
                .await
                .unwrap()
                .call(request($method, $uri, $body))
                .await
                .unwrap()
        };
    }

    // create a network and filter the listing by zone
    let resp = call!("POST", "/1.3/network", CREATE_NETWORK);
    assert_eq!(resp.status(), StatusCode::CREATED);
    let network = body_json(resp).await;
    let network_uuid = network["network"]["uuid"].as_str().unwrap().to_string();

    let resp = call!("GET", "/1.3/network?zone=de-fra1", "");
    let listed = body_json(resp).await;
    assert_eq!(listed["networks"]["network"].as_array().unwrap().len(), 1);

    let resp = call!("GET", "/1.3/network?zone=fi-hel1", "");
    let listed = body_json(resp).await;
    assert!(listed["networks"]["network"].as_array().unwrap().is_empty());

    // create a server on it
    let resp = call!("POST", "/1.3/server", &create_server_body(Some(&network_uuid)));
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let server = body_json(resp).await;
    assert_eq!(server["server"]["state"], "started");
    let server_uuid = server["server"]["uuid"].as_str().unwrap().to_string();

    // network details list the attached server
    let resp = call!("GET", &format!("/1.3/network/{network_uuid}"), "");
    let details = body_json(resp).await;
    assert_eq!(details["network"]["servers"]["server"][0]["uuid"], server_uuid.as_str());

    // a started server cannot be deleted
    let resp = call!("DELETE", &format!("/1.3/server/{server_uuid}?storage=1"), "");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["error_code"], "SERVER_STATE_ILLEGAL");

    // stop, then delete
    let resp = call!(
        "POST",
        &format!("/1.3/server/{server_uuid}/stop"),
        r#"{"stop_server":{"stop_type":"hard","timeout":"60"}}"#
    );
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let stopped = body_json(resp).await;
    assert_eq!(stopped["server"]["state"], "stopped");

    let resp = call!("DELETE", &format!("/1.3/server/{server_uuid}?storage=1"), "");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
    assert_eq!(db.read().await.deleted_storages, 1);

    let resp = call!("GET", &format!("/1.3/server/{server_uuid}"), "");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // remove the network
    let resp = call!("DELETE", &format!("/1.3/network/{network_uuid}"), "");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call!("DELETE", &format!("/1.3/network/{network_uuid}"), "");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_requires_stopped_server() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("POST", "/1.3/server", &create_server_body(None)))
        .await
        .unwrap();
    let uuid = body_json(resp).await["server"]["uuid"].as_str().unwrap().to_string();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("POST", &format!("/1.3/server/{uuid}/start"), r#"{"server":{}}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn private_interface_needs_existing_network() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/1.3/server",
            &create_server_body(Some("00000000-0000-0000-0000-000000000001")),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["error_code"], "NETWORK_NOT_FOUND");
}

#[tokio::test]
async fn delete_without_storage_flag_keeps_storages() {
    use tower::Service;

    let db = Db::default();
    let mut app = app_with_db(db.clone()).into_service();

    macro_rules! call {
        ($method:expr, $uri:expr, $body:expr) => {
            ServiceExt::ready(&mut app)
                .await
                .unwrap()
                .call(request($method, $uri, $body))
                .await
                .unwrap()
        };
    }

    let resp = call!("POST", "/1.3/server", &create_server_body(None));
    let uuid = body_json(resp).await["server"]["uuid"].as_str().unwrap().to_string();
    let resp = call!(
        "POST",
        &format!("/1.3/server/{uuid}/stop"),
        r#"{"stop_server":{"stop_type":"soft","timeout":"10"}}"#
    );
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = call!("DELETE", &format!("/1.3/server/{uuid}"), "");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let store = db.read().await;
    assert!(store.servers.is_empty());
    assert_eq!(store.deleted_storages, 0);
}
