//! Wire types shared by the publish and subscribe endpoints.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::RelayError;

/// The only envelope kind that updates the state cache
pub const STATE_KIND: &str = "state";

/// Opaque producer-supplied state value
pub type StatePayload = Value;

/// A serialized envelope, encoded once and shared by every observer it is sent to
pub type Frame = Arc<str>;

/// Unit of communication between producers and observers.
///
/// When `kind` is absent a string `type` field stands in for it; otherwise
/// `type` is an ordinary field. Any other top-level fields are carried
/// through untouched so fan-out stays verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub kind: String,
    pub payload: StatePayload,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields: Map<String, Value> = Map::deserialize(deserializer)?;

        let kind = match fields.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "envelope kind must be a string, got {}",
                    other
                )))
            }
            None => match fields.remove("type") {
                Some(Value::String(kind)) => kind,
                Some(other) => {
                    fields.insert("type".to_string(), other);
                    String::new()
                }
                None => String::new(),
            },
        };
        let payload = fields.remove("payload").unwrap_or(Value::Null);

        Ok(Self {
            kind,
            payload,
            extra: fields,
        })
    }
}

impl Envelope {
    /// Build the replay envelope for a cached snapshot
    pub fn state(payload: StatePayload) -> Self {
        Self {
            kind: STATE_KIND.to_string(),
            payload,
            extra: Map::new(),
        }
    }

    /// Parse a publish body. An empty body counts as `{}`.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let body: &[u8] = if body.is_empty() {
            b"{}"
        } else {
            body
        };
        Ok(serde_json::from_slice(body)?)
    }

    pub fn is_state(&self) -> bool {
        self.kind == STATE_KIND
    }

    /// Serialize into the shared frame handed to observer connections
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}

/// Acknowledgment returned to a publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishAck {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
