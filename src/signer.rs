//! Document signing functionality.

use crate::canonical::canonicalize;
use crate::document::{self, Layout};
use crate::error::{Result, SignError};
use crate::keys::SecretKey;
use crate::signature::{self, SignatureBlock, RESERVED_KEY};
use serde_json::Value;
use tracing::debug;

/// A builder for signing documents.
#[derive(Debug, Clone)]
pub struct Signer<'a> {
    key: &'a SecretKey,
    key_id: Option<String>,
    layout: Layout,
}

impl<'a> Signer<'a> {
    /// Create a new signer with the given key.
    pub fn new(key: &'a SecretKey) -> Self {
        Self {
            key,
            key_id: None,
            layout: Layout::default(),
        }
    }

    /// Set the key identifier recorded in the block (e.g. a key name or fingerprint).
    pub fn with_key_id<S: Into<String>>(mut self, key_id: S) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Choose how the signed document is written out.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sign a JSON document.
    ///
    /// Fails with [`SignError::AlreadySigned`] if the document already has a
    /// signature block; use [`Signer::resign`] to replace one.
    pub fn sign(&self, document: &[u8]) -> Result<Vec<u8>> {
        let value = document::parse(document)?;
        let was_empty = match &value {
            Value::Object(map) if map.contains_key(RESERVED_KEY) => {
                return Err(SignError::AlreadySigned)
            }
            Value::Object(map) => map.is_empty(),
            _ => return Err(SignError::NotAnObject),
        };

        let block = self.signature_block(&value)?;

        match self.layout {
            Layout::Preserve => {
                document::append_member(document, RESERVED_KEY, &block.to_value(), was_empty)
            }
            layout => document::render(&signature::embed(value, &block)?, layout),
        }
    }

    /// Sign an already-parsed document, returning it with the block appended.
    pub fn sign_value(&self, value: Value) -> Result<Value> {
        if !value.is_object() {
            return Err(SignError::NotAnObject);
        }
        if signature::is_signed(&value) {
            return Err(SignError::AlreadySigned);
        }

        let block = self.signature_block(&value)?;
        signature::embed(value, &block)
    }

    /// Replace the signature on a document.
    ///
    /// Any existing block is extracted (it must be well-formed, but is not
    /// checked) and the document is signed afresh. The output is always
    /// re-rendered, with [`Layout::Preserve`] treated as [`Layout::Pretty`].
    pub fn resign(&self, document: &[u8]) -> Result<Vec<u8>> {
        let value = document::parse(document)?;
        let value = if signature::is_signed(&value) {
            signature::strip(value)?
        } else {
            value
        };

        let signed = self.sign_value(value)?;
        document::render(&signed, self.layout)
    }

    fn signature_block(&self, value: &Value) -> Result<SignatureBlock> {
        let payload = canonicalize(value)?;
        let algorithm = self.key.algorithm();
        debug!(
            %algorithm,
            payload_len = payload.len(),
            payload_sha256 = %payload.digest_hex(),
            "signing canonical payload"
        );

        let mut block = SignatureBlock::new(algorithm, self.key.sign(payload.as_bytes())?);
        block.key_id = self.key_id.clone();
        Ok(block)
    }
}

/// Convenience function to sign a document with default settings.
pub fn sign_json(key: &SecretKey, document: &[u8]) -> Result<Vec<u8>> {
    Signer::new(key).sign(document)
}
