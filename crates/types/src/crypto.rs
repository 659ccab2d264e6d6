//! Cryptographic keys and signatures.
//!
//! Ed25519 throughout. A node's identity is derived from its public key
//! (see [`crate::NodeId::from_public_key`]), so key material is the root of
//! trust for both servers and clients.

use ed25519_dalek::{Signer, Verifier};
use sbor::prelude::BasicSbor;
use std::fmt;

/// Error raised when key material cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Private key bytes were not a valid ed25519 secret key.
    #[error("invalid private key: expected {expected} bytes, got {actual}")]
    InvalidPrivateKey { expected: usize, actual: usize },
    /// Public key bytes were not a valid ed25519 point.
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// An ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
#[sbor(transparent)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Parse from raw bytes, validating the curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(PublicKey(arr))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify `signature` over `message`.
    ///
    /// Returns false for malformed keys or signatures rather than erroring;
    /// a bad signature from the network is an abstention, not a fault.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..4]))
    }
}

/// An ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// The all-zero signature, used as a placeholder in tests.
    pub fn zero() -> Self {
        Signature([0u8; 64])
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Parse from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 64] = bytes.try_into().ok()?;
        Some(Signature(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..4]))
    }
}

/// An ed25519 signing key pair.
#[derive(Clone)]
pub struct KeyPair {
    signing: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing: ed25519_dalek::SigningKey::generate(&mut rng),
        }
    }

    /// Parse a key pair from a 32-byte ed25519 secret key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidPrivateKey {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self {
            signing: ed25519_dalek::SigningKey::from_bytes(&arr),
        })
    }

    /// The secret key bytes (for key files).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let keypair = KeyPair::generate();
        let message = b"attested payload";
        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"original");
        assert!(!keypair.public_key().verify(b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer = KeyPair::generate();
        let other = KeyPair::generate();
        let signature = signer.sign(b"message");
        assert!(!other.public_key().verify(b"message", &signature));
    }

    #[test]
    fn test_keypair_from_bytes_round_trip() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_bytes(&keypair.to_bytes()).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn test_keypair_rejects_short_key() {
        let err = KeyPair::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            KeyError::InvalidPrivateKey {
                expected: 32,
                actual: 3
            }
        ));
    }
}
