//! The JSON envelope convention of the remote API.
//!
//! # Design
//! Every object travels wrapped in a single key named after its resource,
//! `{"server": {...}}`, and every collection is wrapped twice,
//! `{"networks": {"network": [...]}}`. The same doubled wrapping shows up
//! inside resources (`ip_networks.ip_network`, `storage_devices.storage_device`).
//!
//! The wrapper keys live on the resource types through `Resource`, so the
//! key a create request is encoded under is by construction the key its
//! response is decoded from.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// A resource type with its envelope keys.
pub trait Resource {
    /// Singular wrapper key, e.g. `network`.
    const KEY: &'static str;
    /// Plural wrapper key of list responses, e.g. `networks`.
    const PLURAL: &'static str;
}

struct Wrapped<'a, T: ?Sized> {
    key: &'a str,
    value: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for Wrapped<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, self.value)?;
        map.end()
    }
}

/// Serialize `value` as `{"<key>": value}`.
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&Wrapped { key, value })
}

/// Unwrap `{"<key>": {...}}` into `T`.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, DecodeError> {
    let mut root = parse_object(bytes)?;
    let inner = take(&mut root, key)?;
    from_value(key, inner)
}

/// Unwrap `{"<plural>": {"<singular>": [...]}}` into an ordered `Vec<T>`.
///
/// A plural wrapper without the singular key is an empty collection; a
/// missing plural wrapper is an error.
pub fn decode_list<T: DeserializeOwned>(
    plural: &str,
    singular: &str,
    bytes: &[u8],
) -> Result<Vec<T>, DecodeError> {
    let mut root = parse_object(bytes)?;
    let mut wrapper = match take(&mut root, plural)? {
        Value::Object(map) => map,
        _ => return Err(DecodeError::NotAnObject(plural.to_string())),
    };
    match wrapper.remove(singular) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => from_value(singular, items),
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    serde_json::from_slice(bytes).map_err(DecodeError::Json)
}

fn take(map: &mut Map<String, Value>, key: &str) -> Result<Value, DecodeError> {
    map.remove(key)
        .ok_or_else(|| DecodeError::MissingKey(key.to_string()))
}

fn from_value<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Shape {
        key: key.to_string(),
        source,
    })
}

/// `bool` carried on the wire as `"yes"` / `"no"`.
pub mod yes_no {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Str(s) => match s.as_str() {
                "yes" => Ok(true),
                "no" => Ok(false),
                other => Err(D::Error::invalid_value(
                    Unexpected::Str(other),
                    &"\"yes\" or \"no\"",
                )),
            },
        }
    }
}

/// Generate a `#[serde(with = ...)]` module that nests a `Vec<T>` field one
/// level deeper, as `{"<key>": [...]}`.
macro_rules! wrapped_list {
    ($module:ident, $key:literal) => {
        pub(crate) mod $module {
            use serde::ser::SerializeMap;
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            pub fn serialize<S, I>(items: &I, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
                I: Serialize + ?Sized,
            {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry($key, items)?;
                map.end()
            }

            pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
            where
                D: Deserializer<'de>,
                T: Deserialize<'de>,
            {
                #[derive(Deserialize)]
                struct Wrapper<T> {
                    #[serde(rename = $key, default = "Vec::new")]
                    items: Vec<T>,
                }

                Option::<Wrapper<T>>::deserialize(deserializer)
                    .map(|w| w.map(|w| w.items).unwrap_or_default())
            }
        }
    };
}

pub(crate) use wrapped_list;
