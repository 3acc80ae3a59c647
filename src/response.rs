//! Result types produced by a run.
//!
//! The transport hands back a [`RawTransfer`]: the captured header block and
//! body concatenated into one byte buffer, plus [`TransferInfo`] metadata. The
//! scheduler splits it into a [`ResultRecord`] once the transfer is drained.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::engine::response_parser;

/// Opaque identifier assigned to a transfer when it is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Handle(pub(crate) u64);

impl Handle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn duration_as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Transport metadata for one transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    /// URL as it was queued.
    pub url: String,
    /// URL of the final response, after any followed redirects.
    pub effective_url: String,
    /// `0` when no response was received.
    pub http_status: u16,
    /// Byte length of the header block at the front of the raw payload.
    pub header_size: usize,
    /// Target of a redirect that was not followed.
    pub redirect_url: Option<String>,
    pub content_type: Option<String>,
    /// Body length after content decoding.
    pub size_download: usize,
    #[serde(serialize_with = "duration_as_secs")]
    pub total_time: Duration,
    /// Time until the response headers arrived.
    #[serde(serialize_with = "duration_as_secs")]
    pub start_transfer_time: Duration,
    pub remote_addr: Option<SocketAddr>,
}

impl TransferInfo {
    pub fn for_url(url: &str) -> Self {
        TransferInfo {
            url: url.to_string(),
            effective_url: url.to_string(),
            ..Default::default()
        }
    }

    /// Metadata as a JSON object keyed by field name.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// What a transport returns for a successful transfer.
#[derive(Debug, Clone, Default)]
pub struct RawTransfer {
    /// Header block followed by the body.
    pub raw: Vec<u8>,
    pub info: TransferInfo,
}

/// A finished transfer as reported by the multiplexer, before parsing.
#[derive(Debug, Clone)]
pub struct Completion {
    pub handle: Handle,
    pub url: String,
    pub raw: Vec<u8>,
    pub error: Option<String>,
    pub info: TransferInfo,
}

/// Value side of the flat cookie map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieValue {
    Value(String),
    /// A token without `=`, such as `HttpOnly` or `Secure`.
    Flag,
}

impl CookieValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CookieValue::Value(v) => Some(v),
            CookieValue::Flag => None,
        }
    }
}

impl From<&str> for CookieValue {
    fn from(value: &str) -> Self {
        CookieValue::Value(value.to_string())
    }
}

impl Serialize for CookieValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CookieValue::Value(v) => serializer.serialize_str(v),
            CookieValue::Flag => serializer.serialize_bool(false),
        }
    }
}

/// Every `Set-Cookie` token of a header block folded into one map.
pub type CookieMap = HashMap<String, CookieValue>;

/// The parsed outcome of one transfer.
#[derive(Debug, Clone, Default)]
pub struct ResultRecord {
    pub handle: Option<Handle>,
    pub url: String,
    pub body: Vec<u8>,
    pub header: Vec<u8>,
    pub error: Option<String>,
    pub info: TransferInfo,
}

impl ResultRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn http_status(&self) -> u16 {
        self.info.http_status
    }

    pub fn redirect_url(&self) -> Option<&str> {
        response_parser::redirect_target(&self.info)
    }

    pub fn cookies(&self) -> CookieMap {
        response_parser::parse_cookies(&self.header)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header_text(&self) -> String {
        String::from_utf8_lossy(&self.header).into_owned()
    }
}
