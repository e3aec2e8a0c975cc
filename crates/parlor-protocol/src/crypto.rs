//! Room encryption for the Parlor protocol.
//!
//! Uses PBKDF2-HMAC-SHA256 to stretch the shared room secret into a
//! session key, then XChaCha20-Poly1305 AEAD for the payload. Every
//! envelope carries its own random salt, so the key is re-derived per
//! message and no key material ever crosses the wire.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::PeerId;

/// PBKDF2 iteration count for session key derivation.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Per-envelope random salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived session key length in bytes (XChaCha20-Poly1305 key size).
pub const KEY_LEN: usize = 32;

/// XChaCha20 extended nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Crypto failures, deliberately detail-free.
///
/// Decrypt failures collapse into a single variant so callers cannot
/// distinguish a wrong secret from a tampered ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: authentication error")]
    Decrypt,
}

/// Encrypted payload with key derivation metadata.
///
/// Contains everything needed to decrypt given the room secret:
/// ciphertext, nonce, and the salt the session key was derived with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// PBKDF2 salt (16 bytes, fresh per envelope).
    pub salt: [u8; SALT_LEN],
    /// 24-byte nonce (XChaCha20 extended nonce — safe to generate randomly).
    pub nonce: [u8; NONCE_LEN],
    /// XChaCha20-Poly1305 ciphertext (includes 16-byte auth tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, crate::ParlorProtocolError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, crate::ParlorProtocolError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}

/// Stretch the room secret into a 32-byte session key.
///
/// PBKDF2-HMAC-SHA256 with a per-envelope salt. An empty secret is
/// allowed and derives a key like any other input.
pub fn derive_session_key(secret: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt plaintext under the room secret.
///
/// Generates a fresh random salt, derives the session key, and encrypts
/// with XChaCha20-Poly1305 under a random 24-byte nonce.
pub fn encrypt(plaintext: &[u8], secret: &str) -> Result<EncryptedEnvelope, CryptoError> {
    use chacha20poly1305::aead::rand_core::{OsRng, RngCore};

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_session_key(secret, &salt);
    let cipher = XChaCha20Poly1305::new(&key.into());

    // Random 24-byte nonce (safe for random generation with XChaCha20)
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(EncryptedEnvelope {
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt an `EncryptedEnvelope` using the room secret.
///
/// Re-derives the session key from the envelope's salt. Fails closed:
/// any authentication failure yields the same opaque error.
pub fn decrypt(envelope: &EncryptedEnvelope, secret: &str) -> Result<Vec<u8>, CryptoError> {
    let key = derive_session_key(secret, &envelope.salt);
    let cipher = XChaCha20Poly1305::new(&key.into());

    let nonce = XNonce::from(envelope.nonce);
    cipher
        .decrypt(&nonce, envelope.ciphertext.as_ref())
        .map_err(|_| CryptoError::Decrypt)
}

/// Compute the short authentication string for a peer pair.
///
/// SHA-256 over the lexicographically sorted peer ids followed by the
/// room secret; the first four digest bytes render as uppercase hex in
/// two groups of four ("XXXX XXXX"). Both sides compute the same string
/// regardless of who dialed whom.
pub fn compute_sas(a: &PeerId, b: &PeerId, secret: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let mut hasher = Sha256::new();
    hasher.update(first.as_str().as_bytes());
    hasher.update(second.as_str().as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hasher.finalize();

    let hex = format!(
        "{:02X}{:02X}{:02X}{:02X}",
        digest[0], digest[1], digest[2], digest[3]
    );
    format!("{} {}", &hex[..4], &hex[4..])
}
