//! Typed, blocking client for the UpCloud infrastructure API.
//!
//! # Overview
//! Request values are validated, wrapped in the API's JSON envelope and
//! sent with HTTP Basic authentication; responses are unwrapped back into
//! typed records. Servers that change state asynchronously can be followed
//! with a fixed-interval poll.
//!
//! # Design
//! - `Client` holds only immutable configuration and a `Transport`; every
//!   read goes to the remote system, nothing is cached.
//! - The envelope convention (`{"server": {...}}`,
//!   `{"networks": {"network": [...]}}`) lives in `envelope` instead of in
//!   each resource.
//! - Request types are split by capability: every request is an `Endpoint`,
//!   requests with a body are also `Payload`s that validate and encode.
//! - Mutating calls validate before encoding; invalid payloads never reach
//!   the transport.
//! - `Transport` is the only I/O seam. `UreqTransport` is the default;
//!   tests substitute recording transports.

pub mod account;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod network;
pub mod poll;
pub mod request;
pub mod server;
pub mod transport;
pub mod validation;

pub use account::Account;
pub use client::Client;
pub use config::{ClientConfig, Credentials};
pub use error::{DecodeError, Error, FieldError, Result, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use network::{CreateIpNetwork, CreateNetworkRequest, IpNetwork, Network, NetworkServer};
pub use poll::{PollState, Poller, Sleeper, ThreadSleeper};
pub use server::{
    CreateServerInterface, CreateServerIpAddress, CreateServerRequest, CreateServerStorageDevice,
    Server, StopServerRequest, StopType, StorageAction, WaitForServerStateRequest,
};
pub use transport::{Transport, TransportError, UreqTransport};
