// src/security/file_cipher.rs
//! Per-file encryption at rest
//!
//! Record layout: `key(32) || iv(16) || AES-256-CBC/PKCS#7 ciphertext`.
//! A fresh key and IV are drawn for every encryption and stored in the
//! record itself, so the record is self-contained. This protects against
//! casual inspection only: anyone who can read the record can decrypt it,
//! and there is no authentication tag, so a corrupted record may decrypt to
//! garbage unless padding validation happens to catch it.

use std::io::Write;
use std::path::Path;

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::GuardError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const BLOCK_LEN: usize = 16;
/// Size of the `key || iv` prefix.
pub const HEADER_LEN: usize = KEY_LEN + IV_LEN;

/// Encrypt `plaintext` under a fresh random key and IV and return the full record.
pub fn seal_bytes(plaintext: &[u8]) -> Result<Vec<u8>, GuardError> {
    if plaintext.is_empty() {
        return Err(GuardError::InvalidInput("plaintext is empty".to_string()));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut iv = Zeroizing::new([0u8; IV_LEN]);
    OsRng
        .try_fill_bytes(&mut key[..])
        .and_then(|_| OsRng.try_fill_bytes(&mut iv[..]))
        .map_err(|_| GuardError::Crypto("random generation failed"))?;

    let ciphertext = Aes256CbcEnc::new_from_slices(&key[..], &iv[..])
        .map_err(|_| GuardError::Crypto("encryption failed"))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut record = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    record.extend_from_slice(&key[..]);
    record.extend_from_slice(&iv[..]);
    record.extend_from_slice(&ciphertext);
    Ok(record)
}

/// Recover the plaintext from a record produced by [`seal_bytes`].
///
/// Every cipher-level failure maps to the same error so callers cannot be
/// used as a padding oracle.
pub fn open_bytes(record: &[u8]) -> Result<Zeroizing<Vec<u8>>, GuardError> {
    if record.len() < HEADER_LEN + BLOCK_LEN {
        return Err(GuardError::InvalidInput("encrypted record too short".to_string()));
    }

    let (key, rest) = record.split_at(KEY_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(GuardError::Crypto("decryption failed"));
    }

    let plaintext = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| GuardError::Crypto("decryption failed"))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| GuardError::Crypto("decryption failed"))?;
    Ok(Zeroizing::new(plaintext))
}

/// Encrypt `input` into `output`, reporting why on failure.
pub fn encrypt_file_checked(input: &Path, output: &Path) -> Result<(), GuardError> {
    let plaintext = Zeroizing::new(
        std::fs::read(input)
            .map_err(|e| GuardError::Io(format!("read {}: {}", input.display(), e)))?,
    );
    let record = seal_bytes(&plaintext)?;
    write_atomically(output, &record)
}

/// Decrypt `input` into `output`, reporting why on failure.
pub fn decrypt_file_checked(input: &Path, output: &Path) -> Result<(), GuardError> {
    let record = std::fs::read(input)
        .map_err(|e| GuardError::Io(format!("read {}: {}", input.display(), e)))?;
    let plaintext = open_bytes(&record)?;
    write_atomically(output, &plaintext)
}

/// Encrypt a whole file. On `false` the output path holds nothing new.
pub fn encrypt_file<P: AsRef<Path>, Q: AsRef<Path>>(input_path: P, output_path: Q) -> bool {
    match encrypt_file_checked(input_path.as_ref(), output_path.as_ref()) {
        Ok(()) => true,
        Err(err) => {
            debug!("encrypt_file failed: {}", err);
            false
        }
    }
}

/// Decrypt a whole file. On `false` the output path holds nothing new.
pub fn decrypt_file<P: AsRef<Path>, Q: AsRef<Path>>(input_path: P, output_path: Q) -> bool {
    match decrypt_file_checked(input_path.as_ref(), output_path.as_ref()) {
        Ok(()) => true,
        Err(err) => {
            debug!("decrypt_file failed: {}", err);
            false
        }
    }
}

// Write to a sibling temp file and rename over the target so a failure never
// leaves a half-written file under the output name.
fn write_atomically(output: &Path, bytes: &[u8]) -> Result<(), GuardError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| GuardError::Io(format!("create temp file in {}: {}", dir.display(), e)))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(output)
        .map_err(|e| GuardError::Io(format!("write {}: {}", output.display(), e.error)))?;
    Ok(())
}
