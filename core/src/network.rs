//! Private and public networks.

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::envelope::{self, wrapped_list, yes_no, Resource};
use crate::error::Result;
use crate::request::{Endpoint, Payload};
use crate::transport::Transport;
use crate::validation::{validate_not_empty, validate_zone, FieldError, Validate};

wrapped_list!(ip_network_list, "ip_network");
wrapped_list!(server_list, "server");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(with = "ip_network_list", default)]
    pub ip_networks: Vec<IpNetwork>,
    /// Servers attached to the network; only present in detail responses.
    #[serde(with = "server_list", default)]
    pub servers: Vec<NetworkServer>,
}

impl Resource for Network {
    const KEY: &'static str = "network";
    const PLURAL: &'static str = "networks";
}

/// An address block configured on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpNetwork {
    pub address: String,
    pub family: String,
    #[serde(with = "yes_no", default)]
    pub dhcp: bool,
    #[serde(with = "yes_no", default)]
    pub dhcp_default_route: bool,
    #[serde(default)]
    pub dhcp_dns: Vec<String>,
    #[serde(default)]
    pub gateway: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServer {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    pub zone: String,
    #[serde(with = "ip_network_list", default)]
    pub ip_networks: Vec<CreateIpNetwork>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIpNetwork {
    pub address: String,
    #[serde(with = "yes_no")]
    pub dhcp: bool,
    pub family: String,
}

impl Endpoint for CreateNetworkRequest {
    fn path(&self) -> String {
        "/network".to_string()
    }
}

impl Validate for CreateNetworkRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        validate_not_empty("name", &self.name, &mut errors);
        validate_zone("zone", &self.zone, &mut errors);
        errors
    }
}

impl Payload for CreateNetworkRequest {
    fn encode(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        envelope::encode(Network::KEY, self)
    }
}

#[derive(Debug, Clone)]
pub struct GetNetworkDetailsRequest {
    pub uuid: String,
}

impl Endpoint for GetNetworkDetailsRequest {
    fn path(&self) -> String {
        format!("/network/{}", urlencoding::encode(&self.uuid))
    }
}

#[derive(Debug, Clone)]
pub struct DeleteNetworkRequest {
    pub uuid: String,
}

impl Endpoint for DeleteNetworkRequest {
    fn path(&self) -> String {
        format!("/network/{}", urlencoding::encode(&self.uuid))
    }
}

#[derive(Debug, Clone)]
pub struct ListNetworksInZoneRequest {
    pub zone: String,
}

impl Endpoint for ListNetworksInZoneRequest {
    fn path(&self) -> String {
        format!("/network?zone={}", urlencoding::encode(&self.zone))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListNetworksRequest;

impl Endpoint for ListNetworksRequest {
    fn path(&self) -> String {
        "/network".to_string()
    }
}

impl<T: Transport> Client<T> {
    /// `POST /network`.
    pub fn create_network(&self, request: &CreateNetworkRequest) -> Result<Network> {
        self.post_decode(request)
    }

    pub fn get_network_details(&self, uuid: &str) -> Result<Network> {
        self.get(&GetNetworkDetailsRequest {
            uuid: uuid.to_string(),
        })
    }

    pub fn delete_network(&self, uuid: &str) -> Result<()> {
        self.delete(&DeleteNetworkRequest {
            uuid: uuid.to_string(),
        })
    }

    /// Networks in one zone, in the order the API returns them.
    pub fn list_networks_in_zone(&self, zone: &str) -> Result<Vec<Network>> {
        self.get_list(&ListNetworksInZoneRequest {
            zone: zone.to_string(),
        })
    }

    /// Every network visible to the account, in all zones.
    pub fn list_networks(&self) -> Result<Vec<Network>> {
        self.get_list(&ListNetworksRequest)
    }
}
