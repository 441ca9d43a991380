//! Error types for the API client.
//!
//! # Design
//! Every failure is returned to the immediate caller; nothing is retried.
//! Validation problems are detected before a request leaves the process,
//! `Http` carries any non-2xx response verbatim (the body is not
//! interpreted), `Decode` signals a response whose shape does not match the
//! envelope contract, and `Transport` is a connection-level failure.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request payload failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote system answered with a status outside 200-299.
    #[error("{status}: {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: Vec<u8>,
    },

    /// The response body did not have the expected envelope shape.
    #[error("decoding response failed: {0}")]
    Decode(#[from] DecodeError),

    /// The request payload could not be serialized.
    #[error("encoding request failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A state wait exceeded its time budget.
    #[error("timeout reached waiting for state change of server '{uuid}' to {states:?}")]
    WaitTimeout { uuid: String, states: Vec<String> },

    /// Connection-level failure (DNS, TCP, TLS, request timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// The raw body of an HTTP error response, decoded lossily as UTF-8.
    pub fn body_text(&self) -> Option<String> {
        match self {
            Error::Http { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            _ => None,
        }
    }

    /// HTTP status code, if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A response body that does not match the expected envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("missing wrapper key '{0}'")]
    MissingKey(String),

    #[error("wrapper '{0}' is not a JSON object")]
    NotAnObject(String),

    #[error("field '{key}' has unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single invalid field on a request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the field.
    pub name: String,
    /// What is wrong with it.
    pub description: String,
}

impl FieldError {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// All field errors found on one payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    /// Name of the payload type the validation failed on.
    pub name: String,
    pub field_errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationError: {}", self.name)?;
        for err in &self.field_errors {
            write!(f, "\n\t{} - {}", err.name, err.description)?;
        }
        Ok(())
    }
}
