//! Request payloads and decoded response data.
//!
//! # Design
//! `Body` is what a caller sends, `ResponseData` is what the controller
//! stores after classifying a response body. Classification never fails:
//! anything that is not JSON is kept as text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Payload of an outgoing request.
///
/// When deserialized from configuration, a JSON string becomes `Text` and
/// every other JSON value becomes `Json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    /// Serialized with `serde_json` and sent as `application/json`.
    Json(Value),
    /// Sent verbatim.
    Text(String),
}

impl Body {
    /// Serialize any `Serialize` value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, FetchError> {
        Ok(Body::Json(serde_json::to_value(value)?))
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }

    /// Wire representation of the body.
    pub fn encode(&self) -> Result<String, FetchError> {
        match self {
            Body::Json(value) => Ok(serde_json::to_string(value)?),
            Body::Text(text) => Ok(text.clone()),
        }
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Body::Text(text),
            value => Body::Json(value),
        })
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

/// A response body after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Json(Value),
    Text(String),
}

impl ResponseData {
    /// Decode as JSON, falling back to the raw text when that fails.
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => ResponseData::Json(value),
            Err(err) => {
                tracing::trace!(error = %err, "response body is not json, keeping text");
                ResponseData::Text(body.to_string())
            }
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            ResponseData::Json(_) => None,
        }
    }

    /// Deserialize the JSON payload into `T`. Text payloads are tried as a
    /// JSON string.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        let value = match self {
            ResponseData::Json(value) => value.clone(),
            ResponseData::Text(text) => Value::String(text.clone()),
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// GraphQL query payload. `variables` is omitted when not given.
#[derive(Debug, Serialize)]
pub(crate) struct GraphQlQuery<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

/// GraphQL mutation payload. `variables` is omitted when not given.
#[derive(Debug, Serialize)]
pub(crate) struct GraphQlMutation<'a> {
    pub mutation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}
