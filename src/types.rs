use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Star data registered by an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star {
    pub ra: String,
    pub dec: String,
    /// Hex-encoded once the star is stored on the chain
    pub story: String,
}

/// Payload of a star registration: the registering address plus its star data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub address: String,
    pub star: Star,
}

impl From<Body> for Value {
    fn from(body: Body) -> Self {
        json!({
            "address": body.address,
            "star": {
                "ra": body.star.ra,
                "dec": body.star.dec,
                "story": body.star.story,
            },
        })
    }
}

/// A block persisted in the chain
///
/// Field declaration order is the serialization order, and the serialization
/// is what gets hashed. Do not reorder: blocks written by earlier deployments
/// would no longer validate.
///
/// The body is kept as raw JSON with its key order intact. The ledger never
/// interprets it beyond the lookups in `address` and `story`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub body: Value,
    #[serde(with = "unix_seconds")]
    pub time: u64,
    #[serde(rename = "previousBlockHash")]
    pub previous_block_hash: String,
}

impl Block {
    /// Create an unsealed block (empty hash) at the given height
    pub fn new(height: u64, body: impl Into<Value>, time: u64, previous_block_hash: String) -> Self {
        Self {
            hash: String::new(),
            height,
            body: body.into(),
            time,
            previous_block_hash,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Registering address, if the body carries one
    pub fn address(&self) -> Option<&str> {
        self.body.get("address").and_then(Value::as_str)
    }

    /// Stored (hex) star story, if the body carries one
    pub fn story(&self) -> Option<&str> {
        self.body.pointer("/star/story").and_then(Value::as_str)
    }
}

/// Pending validation request held by the mempool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    #[serde(rename = "walletAddress")]
    pub identity: String,
    #[serde(rename = "requestTimeStamp", with = "unix_seconds")]
    pub created_at: u64,
    pub message: String,
    /// Seconds left before eviction; zero or negative means the request is about to go
    #[serde(rename = "validationWindow")]
    pub remaining_window: i64,
}

/// Status block of a confirmed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatus {
    pub address: String,
    #[serde(with = "unix_seconds")]
    pub request_time_stamp: u64,
    pub message: String,
    pub validation_window: i64,
    pub message_signature: bool,
}

/// Request whose challenge message was signed by its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedRequest {
    #[serde(rename = "registerStar")]
    pub confirmed: bool,
    pub status: RequestStatus,
}

/// Kind of chain check that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscrepancyKind {
    /// Stored hash differs from the recomputed digest
    HashMismatch,
    /// previousBlockHash does not match the preceding block
    BrokenLink,
}

/// Integrity finding reported by chain validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub height: u64,
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            DiscrepancyKind::HashMismatch => {
                write!(f, "block hash invalid for block {}", self.height)
            }
            DiscrepancyKind::BrokenLink => {
                write!(f, "previous block hash invalid for block {}", self.height)
            }
        }
    }
}

/// Validation pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request not found on mempool: {0}")]
    NotFound(String),

    #[error("signature is not valid: {0}")]
    InvalidSignature(String),

    #[error("an error has occurred while validating signature: {0}")]
    Verification(String),
}

/// Timestamps travel as decimal strings of epoch seconds, matching data
/// already stored by the chain. Plain numbers are accepted on input.
mod unix_seconds {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(n),
        }
    }
}
