//! Deterministic signature scheme for tests and local runs.

use sha2::{Digest, Sha256};

use crate::task::{
    domain::WalletAddress,
    ports::{SignatureError, SignatureResult, SignatureVerifier},
};

/// Verifier whose signatures are `SHA-256(message ":" address)` in hex.
///
/// This stands in for wallet signature recovery in environments without a
/// signing wallet; [`InMemorySignatureVerifier::sign`] mints the matching
/// signature so tests can produce valid applications.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemorySignatureVerifier;

impl InMemorySignatureVerifier {
    /// Creates a verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Produces the signature the verifier expects for a message/signer
    /// pair.
    #[must_use]
    pub fn sign(message: &str, signer: &WalletAddress) -> String {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        hasher.update(b":");
        hasher.update(signer.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl SignatureVerifier for InMemorySignatureVerifier {
    fn verify(
        &self,
        message: &str,
        signature_hex: &str,
        signer: &WalletAddress,
    ) -> SignatureResult<()> {
        if hex::decode(signature_hex).is_err() {
            return Err(SignatureError::Malformed(signature_hex.to_owned()));
        }
        if signature_hex == Self::sign(message, signer) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}
