//! Persisted login flow state
//!
//! Everything required to resume the flow after the suspension boundary. The
//! hosting process may be torn down while the external agent is in the
//! foreground, so the state must survive serialization to an opaque persisted
//! form and come back field-for-field identical.

use serde::{Deserialize, Serialize};

use crate::error::{LoginError, LoginResult};
use crate::pkce::CodeVerifier;
use crate::types::ClientConfig;

/// Immutable value object carrying one login attempt across suspension
///
/// Created once per attempt before the external agent is launched and
/// destroyed when the flow reaches a terminal outcome. Exactly one state
/// exists per in-flight attempt; a new attempt never reuses another attempt's
/// verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlowState {
    uri_scheme: String,
    code_verifier: String,
    authentication_provider: String,
    app_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login_uri_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alternate_login_host: Option<String>,
}

impl LoginFlowState {
    /// Capture the state for a new login attempt
    pub fn new(
        uri_scheme: impl Into<String>,
        code_verifier: &CodeVerifier,
        authentication_provider: impl Into<String>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            uri_scheme: uri_scheme.into(),
            code_verifier: code_verifier.as_str().to_owned(),
            authentication_provider: authentication_provider.into(),
            app_url: config.app_url.to_string(),
            login_uri_prefix: config.login_uri_prefix.clone(),
            alternate_login_host: config
                .alternate_login_host
                .as_ref()
                .map(std::string::ToString::to_string),
        }
    }

    /// Redirect scheme expected back from the external agent
    #[must_use]
    pub fn uri_scheme(&self) -> &str {
        &self.uri_scheme
    }

    /// The attempt's PKCE verifier
    #[must_use]
    pub fn code_verifier(&self) -> CodeVerifier {
        CodeVerifier::from_persisted(self.code_verifier.clone())
    }

    /// Normalized authentication provider name
    #[must_use]
    pub fn authentication_provider(&self) -> &str {
        &self.authentication_provider
    }

    /// Application base URL captured at flow start
    #[must_use]
    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Optional login endpoint path prefix
    #[must_use]
    pub fn login_uri_prefix(&self) -> Option<&str> {
        self.login_uri_prefix.as_deref()
    }

    /// Optional alternate login host
    #[must_use]
    pub fn alternate_login_host(&self) -> Option<&str> {
        self.alternate_login_host.as_deref()
    }

    /// Serialize to the opaque persisted form
    ///
    /// # Errors
    /// Returns [`LoginError::StateLost`] if serialization fails.
    pub fn to_json(&self) -> LoginResult<String> {
        serde_json::to_string(self).map_err(|e| LoginError::StateLost(e.to_string()))
    }

    /// Rehydrate from the opaque persisted form
    ///
    /// Fails closed: any payload that does not decode into an equivalent
    /// state is a [`LoginError::StateLost`].
    ///
    /// # Errors
    /// Returns [`LoginError::StateLost`] if the payload is malformed.
    pub fn from_json(json: &str) -> LoginResult<Self> {
        serde_json::from_str(json).map_err(|e| LoginError::StateLost(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for state.
    use url::Url;

    use super::*;

    fn verifier() -> CodeVerifier {
        CodeVerifier::from_persisted("v".repeat(43))
    }

    fn config(prefix: Option<&str>, alternate: Option<&str>) -> ClientConfig {
        let mut config = ClientConfig::new(Url::parse("https://myapp.example.net/").unwrap());
        if let Some(prefix) = prefix {
            config = config.with_login_uri_prefix(prefix);
        }
        if let Some(alternate) = alternate {
            config = config.with_alternate_login_host(Url::parse(alternate).unwrap());
        }
        config
    }

    /// Validates `LoginFlowState` serialization behavior for the round trip
    /// scenario with all optional fields present.
    ///
    /// Assertions:
    /// - Confirms `LoginFlowState::from_json(&json)` equals the original
    ///   state.
    #[test]
    fn test_round_trip_all_fields_present() {
        let state = LoginFlowState::new(
            "myapp",
            &verifier(),
            "google",
            &config(Some("/custom/login"), Some("https://login.example.net/")),
        );

        let json = state.to_json().expect("serialization failed");
        let rehydrated = LoginFlowState::from_json(&json).expect("deserialization failed");

        assert_eq!(rehydrated, state);
    }

    /// Validates `LoginFlowState` serialization behavior for the round trip
    /// scenario across every optional-field combination.
    ///
    /// Assertions:
    /// - Confirms each combination survives serialize/deserialize unchanged.
    /// - Ensures absent optionals are omitted from the serialized form.
    #[test]
    fn test_round_trip_optional_combinations() {
        let combinations = [
            (None, None),
            (Some("/custom/login"), None),
            (None, Some("https://login.example.net/")),
            (Some("/custom/login"), Some("https://login.example.net/")),
        ];

        for (prefix, alternate) in combinations {
            let state = LoginFlowState::new("myapp", &verifier(), "aad", &config(prefix, alternate));

            let json = state.to_json().expect("serialization failed");
            let rehydrated = LoginFlowState::from_json(&json).expect("deserialization failed");
            assert_eq!(rehydrated, state, "combination {prefix:?}/{alternate:?} not lossless");

            if prefix.is_none() {
                assert!(!json.contains("login_uri_prefix"));
            }
            if alternate.is_none() {
                assert!(!json.contains("alternate_login_host"));
            }
        }
    }

    /// Validates `LoginFlowState::from_json` behavior for the malformed
    /// payload scenario.
    ///
    /// Assertions:
    /// - Ensures garbage, truncated, and empty payloads all fail closed with
    ///   `LoginError::StateLost`.
    #[test]
    fn test_malformed_payload_fails_closed() {
        for payload in ["", "not json", "{\"uri_scheme\":\"myapp\"}", "{\"uri_scheme\":"] {
            let result = LoginFlowState::from_json(payload);
            assert!(
                matches!(result, Err(LoginError::StateLost(_))),
                "payload {payload:?} did not fail closed"
            );
        }
    }

    /// Validates `LoginFlowState` accessors for the captured configuration
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms every field reflects the attempt's inputs.
    #[test]
    fn test_captured_fields() {
        let state = LoginFlowState::new(
            "myapp",
            &verifier(),
            "facebook",
            &config(None, Some("https://login.example.net/")),
        );

        assert_eq!(state.uri_scheme(), "myapp");
        assert_eq!(state.code_verifier().as_str(), "v".repeat(43));
        assert_eq!(state.authentication_provider(), "facebook");
        assert_eq!(state.app_url(), "https://myapp.example.net/");
        assert_eq!(state.login_uri_prefix(), None);
        assert_eq!(state.alternate_login_host(), Some("https://login.example.net/"));
    }
}
