//! Authorization code exchange
//!
//! Second network leg of the flow: trade the single-use authorization code
//! plus the original PKCE verifier for a user/token pair. One GET, no
//! retries; retries, if desired, belong to a higher layer.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{LoginError, LoginResult};
use crate::state::LoginFlowState;
use crate::types::AuthenticatedUser;
use crate::uri::build_code_exchange_uri;

/// Capability to exchange an authorization code for a user token
///
/// Abstracted so the orchestrator can be driven against a mock endpoint in
/// tests and against different transports in production.
#[async_trait]
pub trait CodeExchange: Send + Sync {
    /// Exchange `code` + the state's verifier for an authenticated user
    ///
    /// # Errors
    /// Returns [`LoginError::ExchangeNetwork`] for transport failures and
    /// [`LoginError::ExchangeProtocol`] for non-2xx or malformed responses.
    async fn exchange(
        &self,
        state: &LoginFlowState,
        code: &str,
    ) -> LoginResult<AuthenticatedUser>;
}

/// Code exchange response body from the authentication gateway
#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(rename = "userId")]
    user_id: String,

    #[serde(rename = "authenticationToken")]
    authentication_token: String,
}

/// HTTP-backed [`CodeExchange`] implementation
#[derive(Debug, Clone)]
pub struct CodeExchangeClient {
    http: reqwest::Client,
}

impl CodeExchangeClient {
    /// Create a client with the default transport (30 second timeout)
    #[must_use]
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    /// Create a client over an injected transport
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for CodeExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeExchange for CodeExchangeClient {
    async fn exchange(
        &self,
        state: &LoginFlowState,
        code: &str,
    ) -> LoginResult<AuthenticatedUser> {
        let url = build_code_exchange_uri(state, code)?;
        debug!(provider = state.authentication_provider(), "issuing code exchange request");

        let response = self.http.get(url).send().await.map_err(LoginError::ExchangeNetwork)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "code exchange rejected");
            return Err(LoginError::ExchangeProtocol {
                status: status.as_u16(),
                message: if body.is_empty() { status.to_string() } else { body },
            });
        }

        let body: ExchangeResponse =
            response.json().await.map_err(|e| LoginError::ExchangeProtocol {
                status: status.as_u16(),
                message: format!("malformed response body: {e}"),
            })?;

        // A token without a user id (or the reverse) is never a success
        if body.user_id.is_empty() || body.authentication_token.is_empty() {
            return Err(LoginError::ExchangeProtocol {
                status: status.as_u16(),
                message: "response missing userId or authenticationToken".to_owned(),
            });
        }

        debug!("code exchange completed");
        Ok(AuthenticatedUser::new(body.user_id, body.authentication_token))
    }
}
