//! Signature verification functionality.

use crate::canonical::canonicalize;
use crate::document::{self, Layout};
use crate::error::{Result, SignError};
use crate::keys::VerificationKey;
use crate::signature::{self, Algorithm, SignatureBlock};
use serde_json::Value;
use tracing::debug;

/// A document whose embedded signature checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedDocument {
    /// The document with the signature block removed.
    pub payload: Value,

    /// The block that was verified.
    pub block: SignatureBlock,
}

impl VerifiedDocument {
    /// The algorithm the document was signed with.
    pub fn algorithm(&self) -> Algorithm {
        self.block.algorithm
    }

    /// The key identifier recorded by the signer, if any.
    pub fn key_id(&self) -> Option<&str> {
        self.block.key_id.as_deref()
    }

    /// Render the payload as compact JSON.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        document::render(&self.payload, Layout::Compact)
    }

    /// Take the payload, dropping the block.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Verifier for embedded document signatures.
pub struct Verifier;

impl Verifier {
    /// Verify the signature embedded in a JSON document.
    pub fn verify(document: &[u8], key: &VerificationKey) -> Result<VerifiedDocument> {
        let value = document::parse(document)?;
        Self::verify_value(value, key)
    }

    /// Verify the signature embedded in an already-parsed document.
    pub fn verify_value(value: Value, key: &VerificationKey) -> Result<VerifiedDocument> {
        let (block, payload) = signature::extract(value)?;

        if block.algorithm != key.algorithm() {
            return Err(SignError::UnsupportedAlgorithm(format!(
                "document is signed with {} but the key is for {}",
                block.algorithm,
                key.algorithm()
            )));
        }

        let canonical = canonicalize(&payload)?;
        debug!(
            algorithm = %block.algorithm,
            key_id = block.key_id.as_deref().unwrap_or("-"),
            payload_len = canonical.len(),
            payload_sha256 = %canonical.digest_hex(),
            "verifying canonical payload"
        );

        key.verify(canonical.as_bytes(), &block.signature)?;

        Ok(VerifiedDocument { payload, block })
    }

    /// Quick check if a document carries a valid signature.
    pub fn is_valid(document: &[u8], key: &VerificationKey) -> bool {
        Self::verify(document, key).is_ok()
    }

    /// Verify and hand back `(payload bytes, valid)`.
    ///
    /// On failure the bytes are empty. Use [`Verifier::verify`] to learn why.
    pub fn check(document: &[u8], key: &VerificationKey) -> (Vec<u8>, bool) {
        match Self::verify(document, key).and_then(|verified| verified.payload_bytes()) {
            Ok(payload) => (payload, true),
            Err(_) => (Vec::new(), false),
        }
    }
}

/// Convenience function to verify a document.
pub fn verify_json(document: &[u8], key: &VerificationKey) -> Result<VerifiedDocument> {
    Verifier::verify(document, key)
}

/// Convenience function to strip the signature block from a document without
/// checking it. The result is rendered with `layout`.
pub fn strip_json(document: &[u8], layout: Layout) -> Result<Vec<u8>> {
    let value = document::parse(document)?;
    let stripped = signature::strip(value)?;
    document::render(&stripped, layout)
}
