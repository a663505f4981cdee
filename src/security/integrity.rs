// src/security/integrity.rs
//! File and self integrity verification
//!
//! SHA-256 digests, streaming file verification against an expected hex
//! digest, and the self-integrity check of the running binary.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::core::errors::GuardError;
use crate::security::process_scan::{ProcessIntrospector, SystemIntrospector};
use crate::utils::bytes_to_hex;

/// Bytes read per iteration when hashing a file.
pub const CHUNK_SIZE: usize = 4096;
/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;
/// Length of a digest rendered as hex.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;
/// Upper bound accepted by [`check_file_plausible`] (10 GiB).
pub const MAX_PLAUSIBLE_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Expected digest of the shipped binary, embedded at build time.
///
/// Produced by the two-phase build: build, run `hostguard digest` on the
/// artifact, rebuild with `HOSTGUARD_SELF_DIGEST` set, then sign.
pub const EXPECTED_SELF_DIGEST: Option<&str> = option_env!("HOSTGUARD_SELF_DIGEST");

/// SHA-256 value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, always 64 characters.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// Compare against the first 64 characters of `expected_hex`.
    ///
    /// ASCII case is ignored. Shorter strings never match; bytes past the
    /// 64th character are ignored.
    pub fn matches_hex(&self, expected_hex: &str) -> bool {
        let Some(prefix) = expected_hex.as_bytes().get(..DIGEST_HEX_LEN) else {
            return false;
        };
        let expected = prefix.to_ascii_lowercase();
        let actual = self.to_hex();
        actual.as_bytes().ct_eq(&expected).into()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest of an in-memory buffer. Total over every input, including empty.
pub fn digest_of(bytes: &[u8]) -> Digest {
    Digest(Sha256::digest(bytes).into())
}

/// Stream a file through SHA-256 in [`CHUNK_SIZE`] pieces.
pub fn digest_file(path: &Path) -> Result<Digest, GuardError> {
    let mut file = File::open(path)
        .map_err(|e| GuardError::Io(format!("open {}: {}", path.display(), e)))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(GuardError::Io(format!("read {}: {}", path.display(), e))),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Digest(hasher.finalize().into()))
}

/// True when the file's SHA-256 equals the first 64 hex characters of `expected_hex`.
pub fn verify_file(path: &Path, expected_hex: &str) -> bool {
    if expected_hex.len() < DIGEST_HEX_LEN {
        debug!("Expected digest shorter than {} characters", DIGEST_HEX_LEN);
        return false;
    }
    match digest_file(path) {
        Ok(actual) => {
            let ok = actual.matches_hex(expected_hex);
            if !ok {
                warn!("Integrity mismatch for {}", path.display());
            }
            ok
        }
        Err(err) => {
            debug!("Integrity check could not read file: {}", err);
            false
        }
    }
}

/// Boundary name for [`verify_file`].
pub fn verify_file_integrity<P: AsRef<Path>>(file_path: P, expected_hex_digest: &str) -> bool {
    verify_file(file_path.as_ref(), expected_hex_digest)
}

/// Cheap sanity check before trusting a file: it exists, is a regular
/// file, is not empty and is no larger than [`MAX_PLAUSIBLE_FILE_SIZE`].
pub fn check_file_plausible<P: AsRef<Path>>(path: P) -> bool {
    match std::fs::metadata(path.as_ref()) {
        Ok(meta) => meta.is_file() && meta.len() > 0 && meta.len() <= MAX_PLAUSIBLE_FILE_SIZE,
        Err(_) => false,
    }
}

/// Hash the on-disk image of the running binary and compare it with `expected_hex`.
///
/// The whole image is read into memory, matching what a patcher would have
/// to reproduce byte for byte.
pub fn self_integrity_check_with<I>(introspector: &I, expected_hex: Option<&str>) -> bool
where
    I: ProcessIntrospector + ?Sized,
{
    let Some(expected) = expected_hex else {
        warn!("No self digest embedded in this build; self-integrity check fails");
        return false;
    };

    let image_path = match introspector.current_executable() {
        Ok(p) => p,
        Err(err) => {
            debug!("Cannot locate own image: {}", err);
            return false;
        }
    };
    let image = match std::fs::read(&image_path) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => return false,
        Err(err) => {
            debug!("Cannot read own image {}: {}", image_path.display(), err);
            return false;
        }
    };

    let ok = digest_of(&image).matches_hex(expected);
    if !ok {
        warn!("Self-integrity mismatch: {} was modified after sealing", image_path.display());
    }
    ok
}

/// Check the running binary against [`EXPECTED_SELF_DIGEST`].
pub fn self_integrity_check() -> bool {
    self_integrity_check_with(&SystemIntrospector, EXPECTED_SELF_DIGEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_digest_of_empty() {
        assert_eq!(digest_of(b"").to_hex(), EMPTY_SHA256);
    }

    #[test]
    fn test_digest_of_abc() {
        assert_eq!(
            digest_of(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_matches_hex_case_insensitive() {
        let d = digest_of(b"");
        assert!(d.matches_hex(EMPTY_SHA256));
        assert!(d.matches_hex(&EMPTY_SHA256.to_uppercase()));
    }

    #[test]
    fn test_matches_hex_ignores_suffix() {
        let d = digest_of(b"");
        assert!(d.matches_hex(&format!("{}trailing-junk", EMPTY_SHA256)));
    }

    #[test]
    fn test_matches_hex_rejects_short_and_non_ascii() {
        let d = digest_of(b"");
        assert!(!d.matches_hex(&EMPTY_SHA256[..63]));
        assert!(!d.matches_hex(""));
        let mut weird = EMPTY_SHA256[..63].to_string();
        weird.push('é');
        assert!(!d.matches_hex(&weird));
    }

    #[test]
    fn test_digest_display_and_debug() {
        let d = digest_of(b"");
        assert_eq!(d.to_string(), EMPTY_SHA256);
        assert_eq!(format!("{:?}", d), format!("Digest({})", EMPTY_SHA256));
    }

    #[test]
    fn test_self_check_without_embedded_digest() {
        assert!(!self_integrity_check_with(&SystemIntrospector, None));
    }
}
