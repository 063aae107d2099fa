//! Login flow error types
//!
//! Every failure in the flow is terminal at this layer: nothing here is
//! retried. Errors surface through the single completion callback as a
//! human-readable message, with the underlying cause preserved as a source.

use thiserror::Error;

/// Error type for the browser-mediated login flow
#[derive(Debug, Error)]
pub enum LoginError {
    /// No navigation request could be built for the external agent
    #[error("Unable to build an authorization request: {0}")]
    Launch(String),

    /// Resumption occurred but no valid flow state could be rehydrated
    #[error("Login state was lost across suspension: {0}")]
    StateLost(String),

    /// Redirect scheme or host did not match this flow
    #[error("Redirect URL is not valid for this login flow: {0}")]
    InvalidRedirect(String),

    /// Validated redirect carried no authorization code
    #[error("Redirect URL did not contain an authorization code")]
    MissingCode,

    /// Transport-level failure during the code exchange
    #[error("Code exchange request failed")]
    ExchangeNetwork(#[source] reqwest::Error),

    /// Non-2xx status or malformed body from the code exchange endpoint
    #[error("Code exchange rejected ({status}): {message}")]
    ExchangeProtocol {
        /// HTTP status returned by the endpoint, 0 when no status applies
        status: u16,
        /// Description of what was wrong with the response
        message: String,
    },

    /// Resumption without a pending flow, or any other unrecoverable
    /// authentication failure
    #[error("Authentication failed")]
    Authentication,
}

/// Discriminant of [`LoginError`], used for terminal-state matching
///
/// [`crate::flow::FlowPhase::Failed`] carries this instead of the full error
/// so that phases stay `Copy` and comparable after the error message has been
/// handed to the completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`LoginError::Launch`]
    Launch,
    /// See [`LoginError::StateLost`]
    StateLost,
    /// See [`LoginError::InvalidRedirect`]
    InvalidRedirect,
    /// See [`LoginError::MissingCode`]
    MissingCode,
    /// See [`LoginError::ExchangeNetwork`]
    ExchangeNetwork,
    /// See [`LoginError::ExchangeProtocol`]
    ExchangeProtocol,
    /// See [`LoginError::Authentication`]
    Authentication,
}

impl LoginError {
    /// Get the matching [`ErrorKind`] discriminant
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch(_) => ErrorKind::Launch,
            Self::StateLost(_) => ErrorKind::StateLost,
            Self::InvalidRedirect(_) => ErrorKind::InvalidRedirect,
            Self::MissingCode => ErrorKind::MissingCode,
            Self::ExchangeNetwork(_) => ErrorKind::ExchangeNetwork,
            Self::ExchangeProtocol { .. } => ErrorKind::ExchangeProtocol,
            Self::Authentication => ErrorKind::Authentication,
        }
    }
}

/// Login flow result type
pub type LoginResult<T> = Result<T, LoginError>;
