//! Key material for signing and verifying documents.
//!
//! Keys are opaque byte strings, base64-encoded at the boundary. Each key is
//! bound to one [`Algorithm`] and validated for it on construction.

use crate::error::{Result, SignError};
use crate::signature::Algorithm;
use base64::Engine;
use ed25519_dalek::{
    Signature, Signer as DalekSigner, SigningKey, VerifyingKey, KEYPAIR_LENGTH,
    PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
enum SecretMaterial {
    Hmac(Zeroizing<Vec<u8>>),
    Ed25519(SigningKey),
}

#[derive(Clone)]
enum VerifyMaterial {
    Hmac(Zeroizing<Vec<u8>>),
    Ed25519(VerifyingKey),
}

/// A key that can produce signatures.
#[derive(Clone)]
pub struct SecretKey {
    material: SecretMaterial,
}

impl SecretKey {
    /// Create an HMAC-SHA256 key from raw bytes. Any non-empty length is accepted.
    pub fn hmac(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SignError::KeyFormat("HMAC key must not be empty".to_string()));
        }
        Ok(Self {
            material: SecretMaterial::Hmac(Zeroizing::new(bytes.to_vec())),
        })
    }

    /// Create an Ed25519 key from a 32-byte seed or a 64-byte `seed || public` keypair.
    pub fn ed25519(bytes: &[u8]) -> Result<Self> {
        let signing_key = match bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut arr = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                arr.copy_from_slice(bytes);
                SigningKey::from_bytes(&arr)
            }
            KEYPAIR_LENGTH => {
                let mut arr = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                arr.copy_from_slice(bytes);
                SigningKey::from_keypair_bytes(&arr).map_err(|_| {
                    SignError::KeyFormat(
                        "Ed25519 keypair public half does not match its seed".to_string(),
                    )
                })?
            }
            len => {
                return Err(SignError::KeyFormat(format!(
                    "Invalid Ed25519 secret key length: expected {} or {}, got {}",
                    SECRET_KEY_LENGTH, KEYPAIR_LENGTH, len
                )))
            }
        };
        Ok(Self {
            material: SecretMaterial::Ed25519(signing_key),
        })
    }

    /// Create a key for `algorithm` from raw bytes.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::HmacSha256 => Self::hmac(bytes),
            Algorithm::Ed25519 => Self::ed25519(bytes),
        }
    }

    /// Decode a key for `algorithm` from standard base64.
    pub fn from_base64(algorithm: Algorithm, encoded: &str) -> Result<Self> {
        let bytes = decode_key(encoded)?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// The algorithm this key signs with.
    pub fn algorithm(&self) -> Algorithm {
        match self.material {
            SecretMaterial::Hmac(_) => Algorithm::HmacSha256,
            SecretMaterial::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// The key that verifies signatures made with this one.
    ///
    /// For HMAC this is the same secret.
    pub fn verification_key(&self) -> VerificationKey {
        let material = match &self.material {
            SecretMaterial::Hmac(secret) => VerifyMaterial::Hmac(secret.clone()),
            SecretMaterial::Ed25519(signing_key) => {
                VerifyMaterial::Ed25519(signing_key.verifying_key())
            }
        };
        VerificationKey { material }
    }

    /// Sign a message and return the raw signature bytes.
    pub(crate) fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.material {
            SecretMaterial::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret)
                    .map_err(|e| SignError::KeyFormat(e.to_string()))?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            SecretMaterial::Ed25519(signing_key) => {
                Ok(signing_key.sign(message).to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// A key that can check signatures.
#[derive(Clone)]
pub struct VerificationKey {
    material: VerifyMaterial,
}

impl VerificationKey {
    /// Create an HMAC-SHA256 verification key (the shared secret).
    pub fn hmac(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SignError::KeyFormat("HMAC key must not be empty".to_string()));
        }
        Ok(Self {
            material: VerifyMaterial::Hmac(Zeroizing::new(bytes.to_vec())),
        })
    }

    /// Create an Ed25519 public key from raw bytes (32 bytes).
    pub fn ed25519(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(SignError::KeyFormat(format!(
                "Invalid public key length: expected {}, got {}",
                PUBLIC_KEY_LENGTH,
                bytes.len()
            )));
        }

        let mut arr = [0u8; PUBLIC_KEY_LENGTH];
        arr.copy_from_slice(bytes);
        let verifying_key = VerifyingKey::from_bytes(&arr)
            .map_err(|_| SignError::KeyFormat("not a valid Ed25519 public key".to_string()))?;
        Ok(Self {
            material: VerifyMaterial::Ed25519(verifying_key),
        })
    }

    /// Create a verification key for `algorithm` from raw bytes.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::HmacSha256 => Self::hmac(bytes),
            Algorithm::Ed25519 => Self::ed25519(bytes),
        }
    }

    /// Decode a verification key for `algorithm` from standard base64.
    pub fn from_base64(algorithm: Algorithm, encoded: &str) -> Result<Self> {
        let bytes = decode_key(encoded)?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// The algorithm this key checks.
    pub fn algorithm(&self) -> Algorithm {
        match self.material {
            VerifyMaterial::Hmac(_) => Algorithm::HmacSha256,
            VerifyMaterial::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// Check a signature over `message`.
    ///
    /// Every failure maps to [`SignError::SignatureMismatch`]; the HMAC tag is
    /// always recomputed in full and compared in constant time.
    pub(crate) fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match &self.material {
            VerifyMaterial::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret)
                    .map_err(|e| SignError::KeyFormat(e.to_string()))?;
                mac.update(message);
                mac.verify_slice(signature)
                    .map_err(|_| SignError::SignatureMismatch)
            }
            VerifyMaterial::Ed25519(verifying_key) => {
                let bytes: [u8; SIGNATURE_LENGTH] = signature
                    .try_into()
                    .map_err(|_| SignError::SignatureMismatch)?;
                let sig = Signature::from_bytes(&bytes);
                verifying_key
                    .verify_strict(message, &sig)
                    .map_err(|_| SignError::SignatureMismatch)
            }
        }
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

fn decode_key(encoded: &str) -> Result<Zeroizing<Vec<u8>>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map(Zeroizing::new)
        .map_err(|e| SignError::KeyFormat(format!("key is not valid base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [7u8; 32];

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231, test case 2.
        let key = SecretKey::hmac(b"Jefe").unwrap();
        let tag = key.sign(b"what do ya want for nothing?").unwrap();
        assert_eq!(
            to_hex(&tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_sign_and_verify() {
        let key = SecretKey::hmac(b"secret").unwrap();
        let tag = key.sign(b"message").unwrap();
        assert_eq!(tag.len(), Algorithm::HmacSha256.signature_len());

        assert!(key.verification_key().verify(b"message", &tag).is_ok());
        assert!(matches!(
            key.verification_key().verify(b"massage", &tag),
            Err(SignError::SignatureMismatch)
        ));

        let wrong = VerificationKey::hmac(b"wrong").unwrap();
        assert!(matches!(
            wrong.verify(b"message", &tag),
            Err(SignError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_empty_hmac_key_rejected() {
        assert!(matches!(SecretKey::hmac(b""), Err(SignError::KeyFormat(_))));
        assert!(matches!(VerificationKey::hmac(b""), Err(SignError::KeyFormat(_))));
    }

    #[test]
    fn test_ed25519_sign_and_verify() {
        let key = SecretKey::ed25519(&SEED).unwrap();
        assert_eq!(key.algorithm(), Algorithm::Ed25519);

        let sig = key.sign(b"message").unwrap();
        assert_eq!(sig.len(), Algorithm::Ed25519.signature_len());
        // Deterministic.
        assert_eq!(sig, key.sign(b"message").unwrap());

        let public = key.verification_key();
        assert!(public.verify(b"message", &sig).is_ok());
        assert!(public.verify(b"other", &sig).is_err());

        let other = SecretKey::ed25519(&[8u8; 32]).unwrap().verification_key();
        assert!(matches!(
            other.verify(b"message", &sig),
            Err(SignError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_ed25519_keypair_form() {
        let keypair_bytes = SigningKey::from_bytes(&SEED).to_keypair_bytes();
        let from_pair = SecretKey::ed25519(&keypair_bytes).unwrap();
        let from_seed = SecretKey::ed25519(&SEED).unwrap();
        assert_eq!(from_pair.sign(b"m").unwrap(), from_seed.sign(b"m").unwrap());

        let mut mismatched = keypair_bytes;
        mismatched[32..].copy_from_slice(SigningKey::from_bytes(&[8u8; 32]).verifying_key().as_bytes());
        assert!(matches!(
            SecretKey::ed25519(&mismatched),
            Err(SignError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_ed25519_lengths() {
        assert!(matches!(SecretKey::ed25519(&[1u8; 31]), Err(SignError::KeyFormat(_))));
        assert!(matches!(VerificationKey::ed25519(&[1u8; 64]), Err(SignError::KeyFormat(_))));
    }

    #[test]
    fn test_base64_keys() {
        use base64::engine::general_purpose::STANDARD;

        let key = SecretKey::from_base64(Algorithm::HmacSha256, &STANDARD.encode(b"secret")).unwrap();
        assert_eq!(key.algorithm(), Algorithm::HmacSha256);

        // Surrounding whitespace (e.g. a trailing newline from a key file) is ignored.
        let padded = format!("  {}\n", STANDARD.encode(SEED));
        let key = SecretKey::from_base64(Algorithm::Ed25519, &padded).unwrap();
        let public_b64 = STANDARD.encode(SigningKey::from_bytes(&SEED).verifying_key().to_bytes());
        let public = VerificationKey::from_base64(Algorithm::Ed25519, &public_b64).unwrap();
        let sig = key.sign(b"m").unwrap();
        assert!(public.verify(b"m", &sig).is_ok());

        assert!(matches!(
            SecretKey::from_base64(Algorithm::HmacSha256, "not base64!"),
            Err(SignError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_debug_redacts_material() {
        let key = SecretKey::hmac(b"super-secret-value").unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("HmacSha256"));
        assert!(!debug.contains("super"));
    }
}
