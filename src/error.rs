//! Error types for the json-sign library.

use thiserror::Error;

/// The main error type for json-sign operations.
///
/// Every variant is local to a single document. Callers processing many
/// documents record the error and move on to the next one.
#[derive(Error, Debug)]
pub enum SignError {
    /// Error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input bytes are not a well-formed JSON document.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The input was empty.
    #[error("Document is empty")]
    EmptyDocument,

    /// The document is valid JSON but its top level is not an object,
    /// so there is nowhere to put a signature block.
    #[error("Document must be a JSON object to carry a signature")]
    NotAnObject,

    /// The value contains something the canonical form cannot represent.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The document already carries a signature block.
    #[error("Document is already signed")]
    AlreadySigned,

    /// No signature block present in the document.
    #[error("No signature found in document")]
    MissingSignature,

    /// The signature block exists but does not have the expected shape.
    #[error("Malformed signature block: {0}")]
    MalformedSignature(String),

    /// The signature block names an algorithm this library (or the supplied
    /// key) cannot check.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Invalid key format or length.
    #[error("Invalid key: {0}")]
    KeyFormat(String),

    /// Cryptographic check failed. Deliberately carries no detail.
    #[error("Signature does not match document")]
    SignatureMismatch,
}

impl SignError {
    /// Whether this error is the tamper / wrong-key outcome rather than a
    /// protocol or configuration problem.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, SignError::SignatureMismatch)
    }
}

/// Result type alias for json-sign operations.
pub type Result<T> = std::result::Result<T, SignError>;
