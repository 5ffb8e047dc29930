//! The embedded signature block and its codec.
//!
//! A signed document carries one extra top-level member:
//!
//! ```json
//! "signature": {"version": 1, "algorithm": "hmac-sha256", "keyId": "k1", "signature": "<base64>"}
//! ```
//!
//! `keyId` is optional. No other fields are accepted inside the block; the
//! rest of the document is free-form.

use crate::canonical::canonical_number;
use crate::error::{Result, SignError};
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The top-level member name that holds the signature block.
pub const RESERVED_KEY: &str = "signature";

/// The current version of the signature format (block shape and canonical form).
pub const FORMAT_VERSION: u32 = 1;

/// Signature algorithms understood by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// HMAC with SHA-256. Symmetric: signing and verification share one secret.
    #[default]
    HmacSha256,
    /// Ed25519 signatures. Signs with a secret seed, verifies with a public key.
    Ed25519,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Algorithm; 2] = [Algorithm::HmacSha256, Algorithm::Ed25519];

    /// The identifier written into the `algorithm` field.
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::HmacSha256 => "hmac-sha256",
            Algorithm::Ed25519 => "ed25519",
        }
    }

    /// Length in bytes of a signature produced by this algorithm.
    pub fn signature_len(&self) -> usize {
        match self {
            Algorithm::HmacSha256 => 32,
            Algorithm::Ed25519 => 64,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Algorithm {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|alg| alg.id() == s)
            .ok_or_else(|| SignError::UnsupportedAlgorithm(s.to_string()))
    }
}

/// Signature metadata embedded in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBlock {
    /// Format version, always [`FORMAT_VERSION`] for blocks this library accepts.
    pub version: u32,

    /// The algorithm that produced `signature`.
    pub algorithm: Algorithm,

    /// Optional identifier of the key that produced the signature.
    pub key_id: Option<String>,

    /// Raw signature bytes (base64 on the wire).
    pub signature: Vec<u8>,
}

/// Wire shape of the block as read from a document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct WireBlock {
    version: Value,
    algorithm: String,
    #[serde(default)]
    key_id: Option<String>,
    signature: String,
}

impl SignatureBlock {
    /// Create a current-version block.
    pub fn new(algorithm: Algorithm, signature: Vec<u8>) -> Self {
        Self {
            version: FORMAT_VERSION,
            algorithm,
            key_id: None,
            signature,
        }
    }

    /// Attach a key identifier.
    pub fn with_key_id<S: Into<String>>(mut self, key_id: S) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// The signature bytes as standard base64.
    pub fn signature_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.signature)
    }

    /// Encode the block as the JSON value stored under [`RESERVED_KEY`].
    pub fn to_value(&self) -> Value {
        let mut block = serde_json::Map::new();
        block.insert("version".to_string(), Value::from(self.version));
        block.insert("algorithm".to_string(), Value::from(self.algorithm.id()));
        if let Some(key_id) = &self.key_id {
            block.insert("keyId".to_string(), Value::from(key_id.as_str()));
        }
        block.insert("signature".to_string(), Value::from(self.signature_base64()));
        Value::Object(block)
    }

    /// Decode and validate a block from its JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(SignError::MalformedSignature(
                "signature block must be an object".to_string(),
            ));
        }

        let wire = WireBlock::deserialize(value)
            .map_err(|e| SignError::MalformedSignature(e.to_string()))?;

        // Any spelling of the number is accepted, like everywhere else in the document.
        let supported = match &wire.version {
            Value::Number(n) => canonical_number(n)
                .map_or(false, |version| version == FORMAT_VERSION.to_string()),
            _ => false,
        };
        if !supported {
            return Err(SignError::MalformedSignature(format!(
                "unsupported version {}",
                wire.version
            )));
        }

        let algorithm: Algorithm = wire.algorithm.parse()?;

        let signature = base64::engine::general_purpose::STANDARD
            .decode(&wire.signature)
            .map_err(|e| SignError::MalformedSignature(format!("signature is not base64: {}", e)))?;
        if signature.len() != algorithm.signature_len() {
            return Err(SignError::MalformedSignature(format!(
                "Invalid signature length: expected {}, got {}",
                algorithm.signature_len(),
                signature.len()
            )));
        }

        Ok(Self {
            version: FORMAT_VERSION,
            algorithm,
            key_id: wire.key_id,
            signature,
        })
    }
}

/// Remove the signature block from a document.
///
/// Returns the decoded block and the document without it.
pub fn extract(value: Value) -> Result<(SignatureBlock, Value)> {
    let mut map = match value {
        Value::Object(map) => map,
        _ => return Err(SignError::MissingSignature),
    };

    // shift_remove keeps the order of the remaining members.
    let raw = map
        .shift_remove(RESERVED_KEY)
        .ok_or(SignError::MissingSignature)?;
    let block = SignatureBlock::from_value(&raw)?;

    Ok((block, Value::Object(map)))
}

/// Append a signature block to a document.
///
/// Refuses to overwrite an existing block; re-signing goes through
/// [`extract`] (or [`strip`]) first.
pub fn embed(value: Value, block: &SignatureBlock) -> Result<Value> {
    let mut map = match value {
        Value::Object(map) => map,
        _ => return Err(SignError::NotAnObject),
    };

    if map.contains_key(RESERVED_KEY) {
        return Err(SignError::AlreadySigned);
    }
    map.insert(RESERVED_KEY.to_string(), block.to_value());

    Ok(Value::Object(map))
}

/// Remove the signature block without checking it, returning the bare document.
///
/// The block must still be well-formed: a document whose `signature` member
/// is something else entirely is not treated as signed.
pub fn strip(value: Value) -> Result<Value> {
    extract(value).map(|(_, document)| document)
}

/// Whether a document carries the reserved key at its top level.
pub fn is_signed(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |map| map.contains_key(RESERVED_KEY))
}
