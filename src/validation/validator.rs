use ethers::types::{Address, Signature};
use std::str::FromStr;
use tracing::{debug, warn};

/// Malformed verifier input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("malformed identity {identity}: {reason}")]
    MalformedIdentity { identity: String, reason: String },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signer could not be recovered: {0}")]
    Recovery(String),
}

/// Checks a signature over a message against an identity
///
/// Returns `Ok(false)` for a well-formed signature by someone else, and
/// `Err` only when the identity or signature cannot be decoded.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        message: &str,
        identity: &str,
        signature: &str,
    ) -> Result<bool, VerificationError>;
}

/// Verifier for Ethereum personal-message signatures
#[derive(Debug, Default, Clone, Copy)]
pub struct EthereumVerifier;

impl SignatureVerifier for EthereumVerifier {
    fn verify(
        &self,
        message: &str,
        identity: &str,
        signature: &str,
    ) -> Result<bool, VerificationError> {
        let address = Address::from_str(identity.trim()).map_err(|e| {
            VerificationError::MalformedIdentity {
                identity: identity.to_string(),
                reason: e.to_string(),
            }
        })?;

        let signature = Signature::from_str(signature.trim())
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;

        // Recover the signer from the EIP-191 hash of the message
        let recovered = signature
            .recover(message)
            .map_err(|e| VerificationError::Recovery(e.to_string()))?;

        if recovered != address {
            warn!("Signature verification failed: signer mismatch for {:?}", address);
            return Ok(false);
        }

        debug!("Signature verified for {:?}", address);
        Ok(true)
    }
}
