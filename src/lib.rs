//! # json-sign
//!
//! Embedded signatures for JSON documents.
//!
//! A signed document is the original document plus one reserved top-level
//! member, `"signature"`, holding the algorithm, an optional key id and the
//! signature bytes. The signature covers a canonical encoding of everything
//! else, so re-serializing the document (reordering keys, changing
//! whitespace, writing `1.0` instead of `1`) does not break it, while any
//! change to the content does.
//!
//! ## Features
//!
//! - **Canonical encoding** independent of key order, whitespace and number spelling
//! - **HMAC-SHA256** (shared secret) and **Ed25519** (public key) signatures
//! - **In-place embedding** that keeps the rest of the document byte for byte
//! - **Batch processing** of many files in parallel
//!
//! ## Quick Start
//!
//! ### Sign a Document
//!
//! ```rust
//! use json_sign::{SecretKey, Signer};
//!
//! let key = SecretKey::hmac(b"secret").unwrap();
//! let signed = Signer::new(&key)
//!     .with_key_id("release-key")
//!     .sign(br#"{"a": 1, "b": "x"}"#)
//!     .unwrap();
//!
//! let text = String::from_utf8(signed).unwrap();
//! assert!(text.starts_with(r#"{"a": 1, "b": "x", "signature": {"version":1,"#));
//! ```
//!
//! ### Verify a Document
//!
//! ```rust
//! use json_sign::{sign_json, SecretKey, SignError, VerificationKey, Verifier};
//!
//! let key = SecretKey::hmac(b"secret").unwrap();
//! let signed = sign_json(&key, br#"{"a": 1, "b": "x"}"#).unwrap();
//!
//! let verified = Verifier::verify(&signed, &key.verification_key()).unwrap();
//! assert_eq!(verified.payload, serde_json::json!({"a": 1, "b": "x"}));
//!
//! let wrong = VerificationKey::hmac(b"wrong").unwrap();
//! assert!(matches!(
//!     Verifier::verify(&signed, &wrong),
//!     Err(SignError::SignatureMismatch)
//! ));
//! ```
//!
//! ### Ed25519
//!
//! ```rust
//! use json_sign::{sign_json, Algorithm, SecretKey, Verifier};
//! use base64::Engine;
//!
//! let seed = base64::engine::general_purpose::STANDARD.encode([42u8; 32]);
//! let key = SecretKey::from_base64(Algorithm::Ed25519, &seed).unwrap();
//! let signed = sign_json(&key, br#"{"channel": "stable"}"#).unwrap();
//!
//! assert!(Verifier::is_valid(&signed, &key.verification_key()));
//! ```

pub mod batch;
pub mod canonical;
pub mod document;
pub mod error;
pub mod keys;
pub mod signature;
pub mod signer;
pub mod verifier;

// Re-export main types for convenience
pub use batch::{process_files, BatchReport, FileOutcome, Operation};
pub use canonical::{canonicalize, CanonicalPayload};
pub use document::Layout;
pub use error::{Result, SignError};
pub use keys::{SecretKey, VerificationKey};
pub use signature::{
    embed, extract, strip, Algorithm, SignatureBlock, FORMAT_VERSION, RESERVED_KEY,
};
pub use signer::{sign_json, Signer};
pub use verifier::{strip_json, verify_json, VerifiedDocument, Verifier};
