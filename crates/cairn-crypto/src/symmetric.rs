//! Symmetric encryption of archive fragment payloads with AES-256-GCM. The
//! session key is derived from the job password by hashing it with SHA-256;
//! the archive engine is responsible for choosing a fresh nonce per chunk.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key as AesKey, Nonce};
use sha2::Digest;

use crate::password::Password;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed: wrong password or corrupted data")]
    Decrypt,
}

pub const NONCE_LEN: usize = 12;

fn derive_key(password: &Password) -> [u8; 32] {
    password.deploy(|plaintext| {
        let mut hasher = sha2::Sha256::new();
        hasher.update(plaintext.as_bytes());
        hasher.finalize().into()
    })
}

/// Encrypts `plaintext` under a key derived from `password`, using `nonce`
/// (exactly [`NONCE_LEN`] bytes, unique per chunk for a given key).
pub fn encrypt(password: &Password, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let key = derive_key(password);
    let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&key));
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: &[],
            },
        )
        .map_err(|_| Error::Encrypt)
}

/// Draws a fresh random nonce. Callers encrypting more than one chunk
/// under the same password must call this once per chunk.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut rng = rsa::rand_core::OsRng;
    let mut bytes = [0u8; NONCE_LEN];
    rsa::rand_core::RngCore::fill_bytes(&mut rng, &mut bytes);
    bytes
}

/// Inverse of [`encrypt`].
pub fn decrypt(password: &Password, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    let key = derive_key(password);
    let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &[],
            },
        )
        .map_err(|_| Error::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let password = Password::new("pw");
        let nonce = [7u8; NONCE_LEN];
        let plaintext = b"Hello\n";
        let ciphertext = encrypt(&password, &nonce, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let decrypted = decrypt(&password, &nonce, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_password_fails_to_decrypt() {
        let nonce = [1u8; NONCE_LEN];
        let ciphertext = encrypt(&Password::new("right"), &nonce, b"data").unwrap();
        let result = decrypt(&Password::new("wrong"), &nonce, &ciphertext);
        assert!(result.is_err());
    }
}
