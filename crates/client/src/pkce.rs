//! PKCE (Proof Key for Code Exchange) verifier and challenge
//!
//! Implements RFC 7636 with the S256 challenge method. The verifier is the
//! flow's only secret: it never leaves the process until the code exchange
//! step, while its hashed challenge travels in the initial authorization
//! request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{LoginError, LoginResult};

/// Number of random bytes backing a code verifier
pub const CODE_VERIFIER_ENTROPY: usize = 32;

/// Minimum encoded verifier length mandated by RFC 7636
pub const MIN_CODE_VERIFIER_LENGTH: usize = 43;

/// Fixed challenge method marker sent with the authorization request
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// High-entropy PKCE code verifier
///
/// One verifier exists per login attempt; a new attempt never reuses another
/// attempt's verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generate a fresh verifier from a cryptographically secure source
    ///
    /// Produces [`CODE_VERIFIER_ENTROPY`] random bytes and base64url-encodes
    /// them without padding.
    ///
    /// # Errors
    /// Returns a non-retryable configuration error if the encoded form falls
    /// below [`MIN_CODE_VERIFIER_LENGTH`] characters.
    pub fn generate() -> LoginResult<Self> {
        let mut rng = rand::thread_rng();
        let random_bytes: Vec<u8> = (0..CODE_VERIFIER_ENTROPY).map(|_| rng.gen()).collect();
        let encoded = URL_SAFE_NO_PAD.encode(random_bytes);

        if encoded.len() < MIN_CODE_VERIFIER_LENGTH {
            return Err(LoginError::Launch(format!(
                "code verifier is shorter than the {MIN_CODE_VERIFIER_LENGTH} characters required \
                 by the PKCE specification"
            )));
        }

        Ok(Self(encoded))
    }

    /// Reconstruct a verifier from its persisted textual form
    ///
    /// Used when rehydrating flow state after a host teardown; performs no
    /// re-validation because the persisted value was validated at generation
    /// time.
    #[must_use]
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive the S256 code challenge for this verifier
    ///
    /// Pure and deterministic: base64url(SHA-256(verifier)) without padding.
    #[must_use]
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// The verifier's textual form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
