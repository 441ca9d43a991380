//! Executing `HttpRequest`s against the network.
//!
//! # Design
//! `Transport` is the single I/O seam of the crate. Implementations return
//! every HTTP response as data, 4xx and 5xx included, so the client alone
//! decides what counts as success. An `Err` from a transport means the
//! exchange itself failed and is propagated without retry.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use ureq::{Agent, RequestBuilder};

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Connection-level failure reported by a `Transport`.
#[derive(Debug)]
pub struct TransportError(Box<dyn StdError + Send + Sync>);

impl TransportError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        Self::new(err)
    }
}

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent keeps its own connection pool and is safe to share between
/// threads.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Build a transport whose requests fail after `timeout` in total.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

fn apply_headers<B>(builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => apply_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Delete, _) => apply_headers(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Post, Some(body)) => {
                apply_headers(self.agent.post(&url), &headers).send(&body[..])
            }
            (HttpMethod::Post, None) => apply_headers(self.agent.post(&url), &headers).send_empty(),
        };

        let mut response = result?;
        let status = response.status();
        let body = response.body_mut().read_to_vec()?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
