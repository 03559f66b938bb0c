//! Wire-level message schema shared by every broker exchange
//!
//! An [`Envelope`] carries a typed [`Header`], a `content` string that is
//! itself JSON (decoded a second time once the header type is known), and an
//! optional open-ended [`Reply`] mapping.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix used by the broker to frame data lines on a stream
pub const DATA_PREFIX: &str = "data:";

/// Logical identifier of a message endpoint
///
/// `name` is the agent type, `id` the session of a specific instance
/// (empty for the type-level endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

impl Address {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.name, self.id)
        }
    }
}

/// Message header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Message type name, used to pick a schema for `content`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl Header {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content_type: None,
            extensions: Map::new(),
        }
    }
}

/// Open reply mapping
///
/// Keys are a broker convention rather than a fixed schema. The only key the
/// runtime looks at is `"address"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(pub Map<String, Value>);

impl Reply {
    /// Reply address, when present as a non-empty, well-formed object
    pub fn address(&self) -> Option<Address> {
        match self.0.get("address") {
            Some(Value::Object(obj)) if !obj.is_empty() => {
                serde_json::from_value(Value::Object(obj.clone())).ok()
            }
            _ => None,
        }
    }

    /// Build a reply mapping that points at `addr`
    pub fn to_address(addr: &Address) -> Self {
        let mut map = Map::new();
        map.insert(
            "address".to_string(),
            serde_json::to_value(addr).unwrap_or(Value::Null),
        );
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Message wrapper exchanged on both publish and subscribe paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,

    /// JSON-encoded, type-specific payload
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

impl Envelope {
    /// Create an envelope with only a header type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            header: Header::new(kind),
            content: String::new(),
            reply: None,
        }
    }

    /// Set `content` by JSON-encoding `payload`
    pub fn with_content<T: Serialize>(mut self, payload: &T) -> serde_json::Result<Self> {
        self.content = serde_json::to_string(payload)?;
        Ok(self)
    }

    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn kind(&self) -> &str {
        &self.header.kind
    }

    /// Decode one raw stream line
    ///
    /// An optional leading `data:` and surrounding whitespace are stripped
    /// before decoding.
    pub fn decode_line(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(strip_framing(raw))
    }

    /// Second-stage decode of `content` into a type-specific payload
    pub fn decode_content<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.content)
    }

    /// Reply address carried by this envelope, if any
    pub fn reply_address(&self) -> Option<Address> {
        self.reply.as_ref().and_then(Reply::address)
    }
}

/// Strip the optional `data:` framing prefix and surrounding whitespace
pub fn strip_framing(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    trimmed
        .strip_prefix(DATA_PREFIX)
        .unwrap_or(trimmed)
        .trim()
}
