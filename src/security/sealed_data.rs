// src/security/sealed_data.rs
//! Small-value encryption keyed by the gated secret
//!
//! The secret released by the [`SecretGate`] is used as the salt of a
//! PBKDF2-HMAC-SHA256 derivation; the derived key seals short strings
//! (settings values, tokens) with AES-256-GCM. Output format:
//! base64url(nonce(12) || ciphertext).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::GuardError;
use crate::security::process_scan::ProcessIntrospector;
use crate::security::secret_gate::{SecretGate, SECRET_LEN};

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
const NONCE_LEN: usize = 12;
const KEY_CONTEXT: &[u8] = b"hostguard-sealed-data-v1";

/// Seals and opens short strings under a key derived from the gated secret.
pub struct DataSealer {
    key: Zeroizing<[u8; 32]>,
}

impl DataSealer {
    /// Ask the gate for the secret and derive the sealing key from it.
    ///
    /// Fails when the gate refuses (debugger attached, foreign host).
    pub fn from_gate<I: ProcessIntrospector>(gate: &SecretGate<I>) -> Result<Self, GuardError> {
        let mut salt = Zeroizing::new([0u8; SECRET_LEN]);
        if !gate.get_secret(&mut salt[..]) {
            return Err(GuardError::Environment("secret gate refused".to_string()));
        }
        Ok(Self::from_salt(&salt[..]))
    }

    fn from_salt(salt: &[u8]) -> Self {
        debug!("Deriving sealing key with PBKDF2 ({} iterations)", PBKDF2_ITERATIONS);
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2_hmac::<Sha256>(KEY_CONTEXT, salt, PBKDF2_ITERATIONS, &mut key[..]);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, GuardError> {
        Aes256Gcm::new_from_slice(&self.key[..]).map_err(|_| GuardError::Crypto("invalid key length"))
    }

    /// Encrypt `plaintext` into a base64url token.
    pub fn seal(&self, plaintext: &str) -> Result<String, GuardError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| GuardError::Crypto("random generation failed"))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| GuardError::Crypto("encryption failed"))?;

        let mut token = nonce_bytes.to_vec();
        token.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(token))
    }

    /// Decrypt a token produced by [`DataSealer::seal`].
    pub fn open(&self, token: &str) -> Result<Zeroizing<String>, GuardError> {
        let raw = URL_SAFE
            .decode(token.trim())
            .map_err(|_| GuardError::InvalidInput("token is not base64url".to_string()))?;
        if raw.len() < NONCE_LEN {
            return Err(GuardError::InvalidInput("token too short".to_string()));
        }

        let cipher = self.cipher()?;
        let nonce = Nonce::from_slice(&raw[..NONCE_LEN]);
        let plaintext = cipher
            .decrypt(nonce, &raw[NONCE_LEN..])
            .map_err(|_| GuardError::Crypto("decryption failed"))?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| GuardError::Crypto("decryption failed"))
    }
}
