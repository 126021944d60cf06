//! Signature verification port for off-chain application messages.

use crate::task::domain::WalletAddress;
use thiserror::Error;

/// Result type for signature verification.
pub type SignatureResult<T> = Result<T, SignatureError>;

/// Verifies that a signature over a message was produced by the holder of
/// a wallet address.
///
/// Verification is pure computation, so the port is synchronous.
pub trait SignatureVerifier: Send + Sync {
    /// Checks `signature_hex` against `message` for `signer`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Malformed`] when the signature cannot be
    /// decoded and [`SignatureError::Mismatch`] when it does not verify.
    fn verify(
        &self,
        message: &str,
        signature_hex: &str,
        signer: &WalletAddress,
    ) -> SignatureResult<()>;
}

/// Errors returned by signature verifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature does not match the message and signer.
    #[error("signature does not match signer")]
    Mismatch,

    /// The signature could not be decoded.
    #[error("malformed signature: {0}")]
    Malformed(String),
}
