//! In-memory stand-in for the UpCloud API.
//!
//! Serves the account, network and server endpoints under `/1.3` with the
//! same JSON envelopes and HTTP Basic authentication as the real service.
//! Server state changes are immediate: a created server is `started`, a
//! stopped one is `stopped`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const DEFAULT_USERNAME: &str = "mock";
pub const DEFAULT_PASSWORD: &str = "mock-password";

pub const ZONES: &[&str] = &[
    "de-fra1", "fi-hel1", "fi-hel2", "nl-ams1", "sg-sin1", "uk-lon1", "us-chi1", "us-sjo1",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    pub uuid: Uuid,
    pub name: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_networks: IpNetworks,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IpNetworks {
    #[serde(default)]
    pub ip_network: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IpNetwork {
    pub address: String,
    pub dhcp: String,
    #[serde(default = "no")]
    pub dhcp_default_route: String,
    #[serde(default)]
    pub dhcp_dns: Vec<String>,
    pub family: String,
    #[serde(default)]
    pub gateway: String,
}

fn no() -> String {
    "no".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Server {
    pub uuid: Uuid,
    pub state: String,
    pub title: String,
    pub hostname: String,
    pub zone: String,
    pub plan: String,
    #[serde(skip)]
    pub networks: Vec<Uuid>,
    #[serde(skip)]
    pub storages: usize,
}

#[derive(Deserialize)]
struct NetworkEnvelope {
    network: CreateNetwork,
}

#[derive(Deserialize)]
struct CreateNetwork {
    name: String,
    zone: String,
    #[serde(default)]
    ip_networks: IpNetworks,
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: CreateServer,
}

#[derive(Deserialize)]
struct CreateServer {
    zone: String,
    #[serde(default)]
    title: String,
    hostname: String,
    storage_devices: StorageDevices,
    networking: Networking,
}

#[derive(Deserialize)]
struct StorageDevices {
    #[serde(default)]
    storage_device: Vec<StorageDevice>,
}

#[derive(Deserialize)]
struct StorageDevice {
    action: String,
}

#[derive(Deserialize)]
struct Networking {
    interfaces: Interfaces,
}

#[derive(Deserialize)]
struct Interfaces {
    #[serde(default)]
    interface: Vec<Interface>,
}

#[derive(Deserialize)]
struct Interface {
    #[serde(rename = "type")]
    kind: String,
    network: Option<Uuid>,
}

#[derive(Deserialize)]
struct StopEnvelope {
    stop_server: StopServer,
}

#[derive(Deserialize)]
struct StopServer {
    stop_type: String,
    timeout: String,
}

#[derive(Deserialize)]
pub struct NetworkFilter {
    pub zone: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteServerParams {
    pub storage: Option<u8>,
}

/// Error in the API's `{"error": {...}}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"error": {"error_code": self.code, "error_message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

#[derive(Default)]
pub struct Store {
    pub networks: HashMap<Uuid, Network>,
    pub servers: HashMap<Uuid, Server>,
    /// Storages removed through `DELETE /server/{uuid}?storage=1`.
    pub deleted_storages: usize,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    username: Arc<str>,
    authorization: Arc<str>,
}

pub fn app() -> Router {
    app_with_credentials(DEFAULT_USERNAME, DEFAULT_PASSWORD)
}

pub fn app_with_credentials(username: &str, password: &str) -> Router {
    router(Db::default(), username, password)
}

/// Router over a caller-held store, so tests can inspect what handlers wrote.
pub fn app_with_db(db: Db) -> Router {
    router(db, DEFAULT_USERNAME, DEFAULT_PASSWORD)
}

fn router(db: Db, username: &str, password: &str) -> Router {
    let token = BASE64.encode(format!("{username}:{password}"));
    let state = AppState {
        db,
        username: Arc::from(username),
        authorization: Arc::from(format!("Basic {token}")),
    };

    let api = Router::new()
        .route("/account", get(get_account))
        .route("/network", get(list_networks).post(create_network))
        .route("/network/{uuid}", get(get_network).delete(delete_network))
        .route("/server", get(list_servers).post(create_server))
        .route("/server/{uuid}", get(get_server).delete(delete_server))
        .route("/server/{uuid}/stop", post(stop_server))
        .route("/server/{uuid}/start", post(start_server))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/1.3", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == &*state.authorization);
    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejecting unauthenticated request");
        return ApiError::new(
            StatusCode::UNAUTHORIZED,
            "AUTHENTICATION_FAILED",
            "Authentication failed using the given username and password.",
        )
        .into_response();
    }
    next.run(request).await
}

fn check_zone(zone: &str) -> Result<(), ApiError> {
    if ZONES.contains(&zone) {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "ZONE_INVALID",
            format!("The zone {zone} is not valid."),
        ))
    }
}

fn network_not_found(uuid: Uuid) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "NETWORK_NOT_FOUND",
        format!("The network {uuid} does not exist."),
    )
}

fn server_not_found(uuid: Uuid) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "SERVER_NOT_FOUND",
        format!("The server {uuid} does not exist."),
    )
}

async fn get_account(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"account": {"username": &*state.username, "credits": 10000}}))
}

fn network_json(network: &Network, store: &Store) -> Value {
    let servers: Vec<Value> = store
        .servers
        .values()
        .filter(|s| s.networks.contains(&network.uuid))
        .map(|s| json!({"uuid": s.uuid, "title": s.title}))
        .collect();
    let mut value = json!(network);
    value["servers"] = json!({"server": servers});
    value
}

async fn list_networks(
    State(state): State<AppState>,
    Query(filter): Query<NetworkFilter>,
) -> Json<Value> {
    let store = state.db.read().await;
    let mut networks: Vec<&Network> = store
        .networks
        .values()
        .filter(|n| filter.zone.as_deref().is_none_or(|z| n.zone == z))
        .collect();
    networks.sort_by(|a, b| a.name.cmp(&b.name).then(a.uuid.cmp(&b.uuid)));
    Json(json!({"networks": {"network": networks}}))
}

async fn create_network(
    State(state): State<AppState>,
    Json(input): Json<NetworkEnvelope>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = input.network;
    check_zone(&input.zone)?;
    let network = Network {
        uuid: Uuid::new_v4(),
        name: input.name,
        zone: input.zone,
        kind: "private".to_string(),
        ip_networks: input.ip_networks,
    };
    tracing::info!(uuid = %network.uuid, zone = %network.zone, "network created");

    let mut store = state.db.write().await;
    let body = json!({"network": network_json(&network, &store)});
    store.networks.insert(network.uuid, network);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_network(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let store = state.db.read().await;
    let network = store.networks.get(&uuid).ok_or_else(|| network_not_found(uuid))?;
    Ok(Json(json!({"network": network_json(network, &store)})))
}

async fn delete_network(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.db.write().await;
    store
        .networks
        .remove(&uuid)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| network_not_found(uuid))
}

async fn list_servers(State(state): State<AppState>) -> Json<Value> {
    let store = state.db.read().await;
    let mut servers: Vec<&Server> = store.servers.values().collect();
    servers.sort_by(|a, b| a.title.cmp(&b.title).then(a.uuid.cmp(&b.uuid)));
    Json(json!({"servers": {"server": servers}}))
}

async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<ServerEnvelope>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = input.server;
    check_zone(&input.zone)?;

    let mut store = state.db.write().await;
    let mut networks = Vec::new();
    for interface in &input.networking.interfaces.interface {
        match (interface.kind.as_str(), interface.network) {
            ("private", Some(uuid)) => {
                if !store.networks.contains_key(&uuid) {
                    return Err(network_not_found(uuid));
                }
                networks.push(uuid);
            }
            ("private", None) => {
                return Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "NETWORK_INVALID",
                    "A private interface requires a network.",
                ));
            }
            _ => {}
        }
    }

    let server = Server {
        uuid: Uuid::new_v4(),
        state: "started".to_string(),
        title: input.title,
        hostname: input.hostname,
        zone: input.zone,
        plan: "1xCPU-1GB".to_string(),
        networks,
        storages: input
            .storage_devices
            .storage_device
            .iter()
            .filter(|d| d.action != "attach")
            .count(),
    };
    tracing::info!(uuid = %server.uuid, zone = %server.zone, "server created");

    let body = json!({"server": server});
    store.servers.insert(server.uuid, server);
    Ok((StatusCode::ACCEPTED, Json(body)))
}

async fn get_server(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let store = state.db.read().await;
    let server = store.servers.get(&uuid).ok_or_else(|| server_not_found(uuid))?;
    Ok(Json(json!({"server": server})))
}

async fn delete_server(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Query(params): Query<DeleteServerParams>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.db.write().await;
    let server = store.servers.get(&uuid).ok_or_else(|| server_not_found(uuid))?;
    if server.state != "stopped" {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "SERVER_STATE_ILLEGAL",
            format!("The server {uuid} is in state {} and cannot be deleted.", server.state),
        ));
    }
    if let Some(server) = store.servers.remove(&uuid) {
        if params.storage == Some(1) {
            store.deleted_storages += server.storages;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn stop_server(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(input): Json<StopEnvelope>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let stop = input.stop_server;
    if !matches!(stop.stop_type.as_str(), "soft" | "hard") || stop.timeout.parse::<u32>().is_err() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "STOP_TYPE_INVALID",
            "The stop request is not valid.",
        ));
    }

    let mut store = state.db.write().await;
    let server = store.servers.get_mut(&uuid).ok_or_else(|| server_not_found(uuid))?;
    if server.state != "started" {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "SERVER_STATE_ILLEGAL",
            format!("The server {uuid} is not started."),
        ));
    }
    server.state = "stopped".to_string();
    tracing::info!(%uuid, stop_type = %stop.stop_type, "server stopped");
    Ok((StatusCode::ACCEPTED, Json(json!({"server": server}))))
}

async fn start_server(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut store = state.db.write().await;
    let server = store.servers.get_mut(&uuid).ok_or_else(|| server_not_found(uuid))?;
    if server.state != "stopped" {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "SERVER_STATE_ILLEGAL",
            format!("The server {uuid} is not stopped."),
        ));
    }
    server.state = "started".to_string();
    tracing::info!(%uuid, "server started");
    Ok((StatusCode::ACCEPTED, Json(json!({"server": server}))))
}
