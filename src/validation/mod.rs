//! Signature Validation Module
//!
//! This module verifies that a challenge message was signed by the identity
//! that requested it. Identities are Ethereum addresses and signatures are
//! EIP-191 personal-message signatures.

mod validator;
pub use validator::{EthereumVerifier, SignatureVerifier, VerificationError};
