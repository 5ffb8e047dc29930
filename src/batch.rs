//! Signing, verifying and stripping many files in one run.
//!
//! Files are independent: each one is read, processed and (for sign and
//! strip) written back in place on the rayon pool. A failure is recorded
//! against its file and the rest of the batch carries on.

use crate::document::Layout;
use crate::error::Result;
use crate::keys::VerificationKey;
use crate::signer::Signer;
use crate::verifier::{strip_json, Verifier};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What to do with each file.
#[derive(Debug, Clone)]
pub enum Operation<'a> {
    /// Sign the file in place. With `resign`, an existing block is replaced.
    Sign { signer: Signer<'a>, resign: bool },
    /// Check the embedded signature; the file is not modified.
    Verify(&'a VerificationKey),
    /// Remove the signature block in place.
    Strip(Layout),
}

impl Operation<'_> {
    /// Past-tense verb used when reporting success ("Signed", ...).
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Sign { .. } => "Signed",
            Operation::Verify(_) => "Verified",
            Operation::Strip(_) => "Stripped",
        }
    }

    /// Apply the operation to one file.
    pub fn apply(&self, path: &Path) -> Result<()> {
        let original = fs::read(path)?;
        match self {
            Operation::Sign { signer, resign } => {
                let signed = if *resign {
                    signer.resign(&original)?
                } else {
                    signer.sign(&original)?
                };
                fs::write(path, signed)?;
            }
            Operation::Verify(key) => {
                Verifier::verify(&original, key)?;
            }
            Operation::Strip(layout) => {
                fs::write(path, strip_json(&original, *layout)?)?;
            }
        }
        Ok(())
    }
}

/// The result of processing one file.
#[derive(Debug)]
pub struct FileOutcome {
    /// The file that was processed.
    pub path: PathBuf,

    /// `Ok` if the operation succeeded for this file.
    pub result: Result<()>,
}

/// Per-file results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per distinct input path.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Whether any file failed. The CLI exits non-zero when this is true.
    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_err())
    }

    /// Get the number of files that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Get the number of files whose signature check failed cryptographically.
    pub fn mismatch_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Err(e) if e.is_mismatch()))
            .count()
    }

    /// Get the number of files that succeeded.
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

/// Apply `operation` to every path.
///
/// A path listed more than once is processed once; two tasks rewriting the
/// same file would race.
pub fn process_files<P>(paths: &[P], operation: &Operation<'_>) -> BatchReport
where
    P: AsRef<Path> + Sync,
{
    let mut seen = HashSet::new();
    let mut unique: Vec<&Path> = Vec::with_capacity(paths.len());
    for path in paths {
        let path: &Path = path.as_ref();
        if seen.insert(path) {
            unique.push(path);
        }
    }

    let outcomes = unique
        .par_iter()
        .map(|path| {
            let result = operation.apply(path);
            match &result {
                Ok(()) => info!(path = %path.display(), operation = operation.verb(), "file done"),
                Err(e) if e.is_mismatch() => {
                    warn!(path = %path.display(), "signature does not match; tampered or wrong key")
                }
                Err(e) => warn!(path = %path.display(), error = %e, "file failed"),
            }
            FileOutcome {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect();

    BatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignError;
    use crate::keys::SecretKey;
    use tempfile::tempdir;

    #[test]
    fn test_sign_batch_continues_past_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.json");
        let broken = dir.path().join("broken.json");
        let missing = dir.path().join("missing.json");
        let empty = dir.path().join("empty.json");
        fs::write(&good, br#"{"a": 1}"#).unwrap();
        fs::write(&broken, b"{oops").unwrap();
        fs::write(&empty, b"").unwrap();

        let key = SecretKey::hmac(b"secret").unwrap();
        let op = Operation::Sign {
            signer: Signer::new(&key),
            resign: false,
        };
        let report = process_files(&[&good, &broken, &missing, &empty], &op);

        assert_eq!(report.outcomes.len(), 4);
        assert!(report.any_failed());
        assert_eq!(report.failed_count(), 3);
        assert_eq!(report.succeeded_count(), 1);

        assert_eq!(report.outcomes[0].path, good);
        assert!(report.outcomes[0].result.is_ok());
        assert!(matches!(report.outcomes[1].result, Err(SignError::Parse(_))));
        assert!(matches!(report.outcomes[2].result, Err(SignError::Io(_))));
        assert!(matches!(report.outcomes[3].result, Err(SignError::EmptyDocument)));

        // The broken file is left as it was.
        assert_eq!(fs::read(&broken).unwrap(), b"{oops");
        assert!(Verifier::is_valid(&fs::read(&good).unwrap(), &key.verification_key()));
    }

    #[test]
    fn test_verify_and_strip_batch() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| {
                let path = dir.path().join(format!("doc{}.json", i));
                fs::write(&path, format!("{{\"index\": {}}}", i)).unwrap();
                path
            })
            .collect();

        let key = SecretKey::ed25519(&[5u8; 32]).unwrap();
        let sign = Operation::Sign {
            signer: Signer::new(&key),
            resign: false,
        };
        assert!(!process_files(&paths, &sign).any_failed());

        // Signing again fails for every file without touching them.
        let again = process_files(&paths, &sign);
        assert_eq!(again.failed_count(), paths.len());

        let public = key.verification_key();
        assert!(!process_files(&paths, &Operation::Verify(&public)).any_failed());

        assert!(!process_files(&paths, &Operation::Strip(Layout::Compact)).any_failed());
        assert_eq!(fs::read(&paths[3]).unwrap(), br#"{"index":3}"#);

        let report = process_files(&paths, &Operation::Verify(&public));
        assert!(report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Err(SignError::MissingSignature))));
    }

    #[test]
    fn test_resign_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, br#"{"a": 1}"#).unwrap();

        let old = SecretKey::hmac(b"old").unwrap();
        let new = SecretKey::hmac(b"new").unwrap();
        process_files(&[&path], &Operation::Sign { signer: Signer::new(&old), resign: false });
        let report = process_files(&[&path], &Operation::Sign { signer: Signer::new(&new), resign: true });
        assert!(!report.any_failed());

        let signed = fs::read(&path).unwrap();
        assert!(Verifier::is_valid(&signed, &new.verification_key()));
        assert!(!Verifier::is_valid(&signed, &old.verification_key()));
    }

    #[test]
    fn test_verify_batch_separates_mismatches() {
        let dir = tempdir().unwrap();
        let signed = dir.path().join("signed.json");
        let tampered = dir.path().join("tampered.json");
        let unsigned = dir.path().join("unsigned.json");

        let key = SecretKey::hmac(b"secret").unwrap();
        let text = crate::signer::sign_json(&key, br#"{"amount": 10}"#).unwrap();
        fs::write(&signed, &text).unwrap();
        let forged = String::from_utf8(text).unwrap().replacen("10", "11", 1);
        fs::write(&tampered, forged).unwrap();
        fs::write(&unsigned, br#"{"amount": 10}"#).unwrap();

        let public = key.verification_key();
        let report = process_files(&[&signed, &tampered, &unsigned], &Operation::Verify(&public));
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.mismatch_count(), 1);
        assert!(report.outcomes[1].result.as_ref().unwrap_err().is_mismatch());
        assert!(!report.outcomes[2].result.as_ref().unwrap_err().is_mismatch());
    }

    #[test]
    fn test_duplicate_paths_processed_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, br#"{"a": 1}"#).unwrap();

        let key = SecretKey::hmac(b"secret").unwrap();
        let op = Operation::Sign {
            signer: Signer::new(&key),
            resign: false,
        };
        let report = process_files(&[&path, &path], &op);
        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.any_failed());
    }
}
