//! # Encryption
//!
//! The store treats encryption as an opaque capability: anything that
//! implements [`Cipher`] can encrypt the database document and the values of
//! sensitive fields. The store never looks inside the ciphertext.
//!
//! [`PasswordCipher`] is the implementation used by the binary:
//!
//! - Key: Argon2id over the user's password with a fixed application salt, so
//!   the same password always opens the same database.
//! - Cipher: AES-256-GCM with a random 96-bit nonce per message. The nonce is
//!   prepended to the ciphertext.
//!
//! Field values live inside a JSON document, so [`encrypt_text`] and
//! [`decrypt_text`] wrap the binary ciphertext in standard base64.

use crate::error::{PwdbError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

const KDF_SALT: &[u8] = b"pwdb::credential-store::v1";
const KDF_MEMORY_KIB: u32 = 19_456;
const KDF_ITERATIONS: u32 = 2;
const KDF_LANES: u32 = 1;

/// Symmetric encrypt/decrypt capability.
///
/// `decrypt` must fail with [`PwdbError::Decryption`] when the key is wrong or
/// the data was tampered with.
pub trait Cipher: fmt::Debug {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Encrypts a string and returns the ciphertext as base64.
pub fn encrypt_text(cipher: &dyn Cipher, plaintext: &str) -> Result<String> {
    let sealed = cipher.encrypt(plaintext.as_bytes())?;
    Ok(STANDARD.encode(sealed))
}

/// Reverses [`encrypt_text`].
pub fn decrypt_text(cipher: &dyn Cipher, encoded: &str) -> Result<String> {
    let sealed = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| PwdbError::Decryption)?;
    let plain = cipher.decrypt(&sealed)?;
    String::from_utf8(plain).map_err(|_| PwdbError::Decryption)
}

pub struct PasswordCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for PasswordCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl PasswordCipher {
    pub fn new(password: &str) -> Result<Self> {
        Self::with_params(password, KDF_MEMORY_KIB, KDF_ITERATIONS)
    }

    /// Derives the key with explicit Argon2 memory (KiB) and iteration costs.
    pub fn with_params(password: &str, memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, KDF_LANES, Some(KEY_LEN))
            .map_err(|e| PwdbError::Encryption(format!("invalid KDF parameters: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(password.as_bytes(), KDF_SALT, &mut key[..])
            .map_err(|e| PwdbError::Encryption(format!("key derivation failed: {}", e)))?;
        Ok(Self { key })
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key[..])
            .map_err(|e| PwdbError::Encryption(format!("failed to create cipher: {}", e)))
    }
}

impl Cipher for PasswordCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = generate_nonce();
        let sealed = self
            .aead()?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| PwdbError::Encryption(format!("encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN {
            return Err(PwdbError::Decryption);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        self.aead()?
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| PwdbError::Decryption)
    }
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut rng = StdRng::from_entropy();
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap(password: &str) -> PasswordCipher {
        PasswordCipher::with_params(password, 64, 1).unwrap()
    }

    #[test]
    fn roundtrip_bytes() {
        let cipher = cheap("secret");
        let sealed = cipher.encrypt(b"this is a message").unwrap();
        assert_ne!(&sealed[NONCE_LEN..], b"this is a message");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"this is a message");
    }

    #[test]
    fn nonces_differ_between_messages() {
        let cipher = cheap("secret");
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn same_password_derives_same_key() {
        let sealed = cheap("secret").encrypt(b"data").unwrap();
        assert_eq!(cheap("secret").decrypt(&sealed).unwrap(), b"data");
    }

    #[test]
    fn wrong_password_fails() {
        let sealed = cheap("secret").encrypt(b"data").unwrap();
        assert!(matches!(
            cheap("other").decrypt(&sealed),
            Err(PwdbError::Decryption)
        ));
    }

    #[test]
    fn truncated_input_fails() {
        let cipher = cheap("secret");
        assert!(matches!(cipher.decrypt(b"short"), Err(PwdbError::Decryption)));
    }

    #[test]
    fn text_helpers_roundtrip() {
        let cipher = cheap("secret");
        let encoded = encrypt_text(&cipher, "1234").unwrap();
        assert_ne!(encoded, "1234");
        assert_eq!(decrypt_text(&cipher, &encoded).unwrap(), "1234");
        assert!(matches!(
            decrypt_text(&cipher, "not base64!"),
            Err(PwdbError::Decryption)
        ));
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", cheap("secret"));
        assert!(rendered.contains("redacted"));
    }
}
