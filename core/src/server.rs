//! Servers: creation, lifecycle actions and waiting on state changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::envelope::{self, wrapped_list, Resource};
use crate::error::Result;
use crate::poll::{Poller, Sleeper, ThreadSleeper};
use crate::request::{Endpoint, Payload};
use crate::transport::Transport;
use crate::validation::{
    validate_count, validate_max_len, validate_not_empty, validate_zone, FieldError, Validate,
    MAX_HOSTNAME_LEN, MAX_TITLE_LEN,
};

wrapped_list!(storage_device_list, "storage_device");
wrapped_list!(interface_list, "interface");
wrapped_list!(ip_address_list, "ip_address");

/// Well-known values of `Server::state`. The remote system may report
/// others.
pub mod state {
    pub const STARTED: &str = "started";
    pub const STOPPED: &str = "stopped";
    pub const MAINTENANCE: &str = "maintenance";
    pub const ERROR: &str = "error";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub uuid: String,
    pub state: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl Resource for Server {
    const KEY: &'static str = "server";
    const PLURAL: &'static str = "servers";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServerRequest {
    /// Zone the server is hosted in, e.g. `fi-hel1`.
    pub zone: String,
    /// Short informational description, at most 64 characters.
    pub title: String,
    /// A valid domain name, at most 128 characters.
    pub hostname: String,
    /// 1-8 storages to create, clone or attach.
    #[serde(with = "storage_device_list")]
    pub storage_devices: Vec<CreateServerStorageDevice>,
    /// 1-10 network interfaces.
    #[serde(rename = "networking", with = "networking")]
    pub interfaces: Vec<CreateServerInterface>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServerInterface {
    /// `public`, `utility` or `private`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "ip_address_list")]
    pub ip_addresses: Vec<CreateServerIpAddress>,
    /// Network UUID; required for private interfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServerIpAddress {
    pub family: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageAction {
    Create,
    Clone,
    Attach,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServerStorageDevice {
    pub action: StorageAction,
    /// Size in gigabytes, 10-1024. Used by `create` and `clone`.
    pub size: u32,
    /// Source storage UUID for `clone` and `attach`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// `{"interfaces": {"interface": [...]}}` under the `networking` key.
mod networking {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{interface_list, CreateServerInterface};

    #[derive(Serialize)]
    struct Borrowed<'a> {
        #[serde(serialize_with = "interface_list::serialize")]
        interfaces: &'a [CreateServerInterface],
    }

    #[derive(Deserialize)]
    struct Owned {
        #[serde(with = "interface_list", default)]
        interfaces: Vec<CreateServerInterface>,
    }

    pub fn serialize<S: Serializer>(items: &[CreateServerInterface], serializer: S) -> Result<S::Ok, S::Error> {
        Borrowed { interfaces: items }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<CreateServerInterface>, D::Error> {
        Owned::deserialize(deserializer).map(|o| o.interfaces)
    }
}

impl Endpoint for CreateServerRequest {
    fn path(&self) -> String {
        "/server".to_string()
    }
}

impl Validate for CreateServerRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        validate_zone("zone", &self.zone, &mut errors);
        validate_max_len("title", &self.title, MAX_TITLE_LEN, &mut errors);
        validate_not_empty("hostname", &self.hostname, &mut errors);
        validate_max_len("hostname", &self.hostname, MAX_HOSTNAME_LEN, &mut errors);
        validate_count("interfaces", self.interfaces.len(), 1, 10, &mut errors);
        validate_count("storage_devices", self.storage_devices.len(), 1, 8, &mut errors);

        for (i, interface) in self.interfaces.iter().enumerate() {
            if interface.kind == "private" && interface.network.is_none() {
                errors.push(FieldError::new(
                    format!("interfaces[{i}].network"),
                    "required for private interfaces",
                ));
            }
        }

        for (i, device) in self.storage_devices.iter().enumerate() {
            device.validate_into(i, &mut errors);
        }
        errors
    }
}

impl CreateServerStorageDevice {
    fn validate_into(&self, index: usize, errors: &mut Vec<FieldError>) {
        let field = |name: &str| format!("storage_devices[{index}].{name}");

        validate_max_len(&field("title"), &self.title, MAX_TITLE_LEN, errors);
        if matches!(self.action, StorageAction::Create | StorageAction::Clone)
            && !(10..=1024).contains(&self.size)
        {
            errors.push(FieldError::new(
                field("size"),
                format!("{} not within 10-1024", self.size),
            ));
        }
        if matches!(self.action, StorageAction::Clone | StorageAction::Attach)
            && self.storage.as_deref().is_none_or(str::is_empty)
        {
            errors.push(FieldError::new(field("storage"), "source storage UUID required"));
        }
    }
}

impl Payload for CreateServerRequest {
    fn encode(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        envelope::encode(Server::KEY, self)
    }
}

#[derive(Debug, Clone)]
pub struct GetServerDetailsRequest {
    pub uuid: String,
}

impl Endpoint for GetServerDetailsRequest {
    fn path(&self) -> String {
        format!("/server/{}", urlencoding::encode(&self.uuid))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListServersRequest;

impl Endpoint for ListServersRequest {
    fn path(&self) -> String {
        "/server".to_string()
    }
}

/// Deletes the server together with its storages.
#[derive(Debug, Clone)]
pub struct DeleteServerRequest {
    pub uuid: String,
}

impl Endpoint for DeleteServerRequest {
    fn path(&self) -> String {
        format!("/server/{}?storage=1", urlencoding::encode(&self.uuid))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopType {
    /// ACPI shutdown, forced after the timeout.
    Soft,
    Hard,
}

#[derive(Debug, Clone)]
pub struct StopServerRequest {
    pub uuid: String,
    pub stop_type: StopType,
    /// How long a soft stop may take before it is forced.
    pub timeout: Duration,
}

impl StopServerRequest {
    /// Hard stop with a 60 second timeout.
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            stop_type: StopType::Hard,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Endpoint for StopServerRequest {
    fn path(&self) -> String {
        format!("/server/{}/stop", urlencoding::encode(&self.uuid))
    }
}

impl Validate for StopServerRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let secs = self.timeout.as_secs();
        if !(1..=600).contains(&secs) {
            errors.push(FieldError::new(
                "timeout",
                format!("{secs}s not within 1-600s"),
            ));
        }
        errors
    }
}

impl Payload for StopServerRequest {
    fn encode(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        #[derive(Serialize)]
        struct StopServer {
            stop_type: StopType,
            timeout: String,
        }

        envelope::encode(
            "stop_server",
            &StopServer {
                stop_type: self.stop_type,
                timeout: self.timeout.as_secs().to_string(),
            },
        )
    }
}

#[derive(Debug, Clone)]
pub struct StartServerRequest {
    pub uuid: String,
}

impl Endpoint for StartServerRequest {
    fn path(&self) -> String {
        format!("/server/{}/start", urlencoding::encode(&self.uuid))
    }
}

impl Validate for StartServerRequest {
    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

impl Payload for StartServerRequest {
    fn encode(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        envelope::encode(Server::KEY, &serde_json::Map::new())
    }
}

#[derive(Debug, Clone)]
pub struct WaitForServerStateRequest {
    pub uuid: String,
    /// Any of these ends the wait.
    pub wait_states: Vec<String>,
    pub timeout: Duration,
}

impl<T: Transport> Client<T> {
    /// `POST /server`. The returned server is usually still in
    /// `maintenance`; use `wait_for_server_state` to follow it.
    pub fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        self.post_decode(request)
    }

    pub fn get_server_details(&self, uuid: &str) -> Result<Server> {
        self.get(&GetServerDetailsRequest {
            uuid: uuid.to_string(),
        })
    }

    pub fn list_servers(&self) -> Result<Vec<Server>> {
        self.get_list(&ListServersRequest)
    }

    /// Delete a server and every storage attached to it.
    pub fn delete_server(&self, uuid: &str) -> Result<()> {
        self.delete(&DeleteServerRequest {
            uuid: uuid.to_string(),
        })
    }

    /// Hard stop with the default timeout.
    pub fn stop_server(&self, uuid: &str) -> Result<()> {
        self.stop_server_with(&StopServerRequest::new(uuid))
    }

    pub fn stop_server_with(&self, request: &StopServerRequest) -> Result<()> {
        self.post(request)?;
        Ok(())
    }

    pub fn start_server(&self, uuid: &str) -> Result<Server> {
        self.post_decode(&StartServerRequest {
            uuid: uuid.to_string(),
        })
    }

    /// Block until the server reports one of `request.wait_states`,
    /// checking every `poll_interval` of the client configuration.
    pub fn wait_for_server_state(&self, request: &WaitForServerStateRequest) -> Result<Server> {
        self.wait_for_server_state_with(request, ThreadSleeper)
    }

    pub fn wait_for_server_state_with<S: Sleeper>(
        &self,
        request: &WaitForServerStateRequest,
        sleeper: S,
    ) -> Result<Server> {
        let poller = Poller::with_sleeper(self.config().poll_interval, request.timeout, sleeper);
        poller.wait(
            &request.uuid,
            &request.wait_states,
            || self.get_server_details(&request.uuid),
            |server: &Server| server.state.as_str(),
        )
    }
}
