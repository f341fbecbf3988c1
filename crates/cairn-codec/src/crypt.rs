//! Symmetric and asymmetric encryption of fragment payloads.
//!
//! Asymmetric mode is a hybrid scheme: a random AES-256 session key encrypts
//! the payload, and the session key itself is wrapped with RSA-OAEP under
//! the recipient's public key. The wrapped session key is the `KEY0` chunk
//! payload; the ciphertext still flows through the same `FDA0` framing as
//! symmetric mode.

use cairn_crypto::password::Password;
use cairn_crypto::symmetric::{self, NONCE_LEN};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CryptAlgorithm {
    None,
    Symmetric,
    Asymmetric,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("symmetric crypto error: {0}")]
    Symmetric(#[from] symmetric::Error),
    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("ciphertext too short to contain a nonce")]
    Truncated,
}

/// The session-key envelope written as a `KEY0` chunk in asymmetric mode.
pub struct KeyEnvelope {
    pub wrapped_session_key: Vec<u8>,
}

/// Encrypts `plaintext` for symmetric mode, prefixing the nonce so the
/// reader does not need out-of-band state.
pub fn encrypt_symmetric(password: &Password, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let ciphertext = symmetric::encrypt(password, nonce, plaintext)?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt_symmetric(password: &Password, framed: &[u8]) -> Result<Vec<u8>, Error> {
    if framed.len() < NONCE_LEN {
        return Err(Error::Truncated);
    }
    let (nonce, ciphertext) = framed.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().expect("checked length above");
    Ok(symmetric::decrypt(password, &nonce, ciphertext)?)
}

/// Generates a random AES-256 session key, encrypts `plaintext` with it, and
/// wraps the session key under `public_key`.
pub fn encrypt_asymmetric(
    public_key: &RsaPublicKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<(KeyEnvelope, Vec<u8>), Error> {
    let session_key_bytes: [u8; 32] = rand_bytes_32();
    let session_password = Password::new(hex::encode(session_key_bytes));

    let ciphertext = encrypt_symmetric(&session_password, nonce, plaintext)?;

    let mut rng = rsa::rand_core::OsRng;
    let wrapped = public_key.encrypt(&mut rng, Oaep::new::<sha2::Sha256>(), &session_key_bytes)?;
    Ok((
        KeyEnvelope {
            wrapped_session_key: wrapped,
        },
        ciphertext,
    ))
}

pub fn decrypt_asymmetric(
    private_key: &RsaPrivateKey,
    envelope: &KeyEnvelope,
    framed_ciphertext: &[u8],
) -> Result<Vec<u8>, Error> {
    let session_key_bytes = private_key.decrypt(Oaep::new::<sha2::Sha256>(), &envelope.wrapped_session_key)?;
    let session_password = Password::new(hex::encode(session_key_bytes));
    decrypt_symmetric(&session_password, framed_ciphertext)
}

fn rand_bytes_32() -> [u8; 32] {
    let mut rng = rsa::rand_core::OsRng;
    let mut bytes = [0u8; 32];
    rsa::rand_core::RngCore::fill_bytes(&mut rng, &mut bytes);
    bytes
}
