//! Authenticated request/response plumbing shared by every resource.
//!
//! # Design
//! `Client` holds immutable configuration, the precomputed `Authorization`
//! header and a `Transport`. Each call builds an `HttpRequest`, hands it to
//! the transport and classifies the status: 200-299 yields the body, any
//! other status becomes `Error::Http` with the body untouched. Mutating
//! calls validate before encoding, so an invalid payload never reaches the
//! transport. No state is cached between calls.
//!
//! The per-resource operations live next to their types in `account`,
//! `network` and `server`.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, Credentials};
use crate::envelope::{self, Resource};
use crate::error::{Error, Result, ValidationError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::request::{Endpoint, Payload};
use crate::transport::{Transport, UreqTransport};

/// Blocking client for the infrastructure API.
pub struct Client<T = UreqTransport> {
    config: ClientConfig,
    authorization: String,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client for the production API with default settings.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.request_timeout);
        Self::with_transport(credentials, config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(credentials: Credentials, config: ClientConfig, transport: T) -> Self {
        let token = BASE64.encode(format!("{}:{}", credentials.username, credentials.password));
        Self {
            config,
            authorization: format!("Basic {token}"),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build an authenticated request for `path` under the API root.
    pub fn build_request(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            headers: vec![
                ("Authorization".to_string(), self.authorization.clone()),
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }

    fn send(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(method = method.as_str(), %url, "sending request");

        let response = self.transport.execute(request)?;
        tracing::debug!(method = method.as_str(), %url, status = response.status, "received response");
        check_status(response)
    }

    /// `GET` a single resource.
    pub fn get<R>(&self, endpoint: &impl Endpoint) -> Result<R>
    where
        R: Resource + DeserializeOwned,
    {
        let body = self.send(self.build_request(HttpMethod::Get, &endpoint.path(), None))?;
        Ok(envelope::decode(R::KEY, &body)?)
    }

    /// `GET` a collection wrapped as `{"<plural>": {"<key>": [...]}}`.
    pub fn get_list<R>(&self, endpoint: &impl Endpoint) -> Result<Vec<R>>
    where
        R: Resource + DeserializeOwned,
    {
        let body = self.send(self.build_request(HttpMethod::Get, &endpoint.path(), None))?;
        Ok(envelope::decode_list(R::PLURAL, R::KEY, &body)?)
    }

    /// Validate, encode and `POST` a payload, returning the raw response body.
    pub fn post<P: Payload>(&self, payload: &P) -> Result<Vec<u8>> {
        let field_errors = payload.validate();
        if !field_errors.is_empty() {
            let err = ValidationError {
                name: payload.name().to_string(),
                field_errors,
            };
            tracing::debug!(payload = %err.name, errors = err.field_errors.len(), "validation failed");
            return Err(err.into());
        }

        let body = payload.encode().map_err(Error::Encode)?;
        self.send(self.build_request(HttpMethod::Post, &payload.path(), Some(body)))
    }

    /// `POST` a payload and decode the resource in the response.
    pub fn post_decode<P, R>(&self, payload: &P) -> Result<R>
    where
        P: Payload,
        R: Resource + DeserializeOwned,
    {
        let body = self.post(payload)?;
        Ok(envelope::decode(R::KEY, &body)?)
    }

    pub fn delete(&self, endpoint: &impl Endpoint) -> Result<()> {
        self.send(self.build_request(HttpMethod::Delete, &endpoint.path(), None))?;
        Ok(())
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Map non-2xx responses to `Error::Http`, keeping the body verbatim.
fn check_status(response: HttpResponse) -> Result<Vec<u8>> {
    if response.is_success() {
        return Ok(response.body);
    }
    tracing::warn!(status = response.status, "request failed");
    Err(Error::Http {
        status: response.status,
        status_text: response.status_text,
        body: response.body,
    })
}
