//! Capabilities a request value can have.
//!
//! Every request names its endpoint. Requests that carry a body are also
//! `Payload`s: they validate themselves and encode their envelope.

use crate::validation::Validate;

/// A request addressed to one API endpoint.
pub trait Endpoint {
    /// Path relative to the API root, including any query string.
    fn path(&self) -> String;
}

/// A request with a JSON body.
pub trait Payload: Endpoint + Validate {
    /// Serialize the body, envelope included.
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error>;

    /// Payload name reported in validation errors.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
