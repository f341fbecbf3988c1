//! Signs and verifies an archive's final content hash with RSA/PKCS#1v1.5
//! over SHA-256, written to/read from the `SGN0` chunk.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("signature verification failed")]
    Verify,
    #[error("malformed signature bytes")]
    Malformed,
}

/// Signs `digest` (the archive's content hash) with `private_key`.
pub fn sign(private_key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>, Error> {
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let mut rng = rsa::rand_core::OsRng;
    let signature = signing_key.try_sign_with_rng(&mut rng, digest).map_err(|e| Error::Sign(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verifies `signature` over `digest` against `public_key`.
pub fn verify(public_key: &RsaPublicKey, digest: &[u8], signature: &[u8]) -> Result<(), Error> {
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    let signature = Signature::try_from(signature).map_err(|_| Error::Malformed)?;
    verifying_key
        .verify(digest, &signature)
        .map_err(|_| Error::Verify)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("generate rsa key");
        let public_key = RsaPublicKey::from(&private_key);
        (private_key, public_key)
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let (private_key, public_key) = test_keypair();
        let digest = b"0123456789abcdef0123456789abcdef";
        let signature = sign(&private_key, digest).unwrap();
        assert!(verify(&public_key, digest, &signature).is_ok());
    }

    #[test]
    fn tampered_digest_fails_verification() {
        let (private_key, public_key) = test_keypair();
        let signature = sign(&private_key, b"original-digest-bytes").unwrap();
        assert!(verify(&public_key, b"different-digest-byte", &signature).is_err());
    }
}
