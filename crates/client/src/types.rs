//! Core login flow types
//!
//! Defines the caller-facing configuration and outcome structures for the
//! browser-mediated login flow.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ErrorKind, LoginError};

/// Authenticated user returned by a completed login flow
///
/// Both fields are required: the flow never reports a token without a user id
/// (or the reverse) as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable user identifier assigned by the authentication gateway
    pub user_id: String,

    /// Session token for subsequent authenticated calls
    pub authentication_token: String,
}

impl AuthenticatedUser {
    /// Create a new authenticated user
    #[must_use]
    pub fn new(user_id: impl Into<String>, authentication_token: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), authentication_token: authentication_token.into() }
    }
}

/// Terminal outcome of a login flow
///
/// Delivered exactly once per flow instance through the completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Login succeeded with an authenticated user
    Success(AuthenticatedUser),

    /// Login failed; `message` is suitable for surfacing to the caller
    Failure {
        /// Which class of failure terminated the flow
        kind: ErrorKind,
        /// Human-readable description of the failure
        message: String,
    },
}

impl LoginOutcome {
    /// Build a failure outcome from a [`LoginError`]
    #[must_use]
    pub fn failure(error: &LoginError) -> Self {
        Self::Failure { kind: error.kind(), message: error.to_string() }
    }

    /// Whether this outcome is a success
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Client configuration for the login flow
///
/// Captures where the authentication gateway lives. Mirrors the hosting
/// client's bootstrap values; the flow itself never mutates it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application base URL; its host-only form anchors login endpoints when
    /// no alternate login host is configured
    pub app_url: Url,

    /// Path prefix for login endpoints; `None` means the gateway default
    /// (`.auth/login`)
    pub login_uri_prefix: Option<String>,

    /// Dedicated login host overriding the application base URL
    pub alternate_login_host: Option<Url>,
}

impl ClientConfig {
    /// Create a configuration anchored at the application base URL
    #[must_use]
    pub fn new(app_url: Url) -> Self {
        Self { app_url, login_uri_prefix: None, alternate_login_host: None }
    }

    /// Override the login endpoint path prefix
    #[must_use]
    pub fn with_login_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.login_uri_prefix = Some(prefix.into());
        self
    }

    /// Route login endpoints through a dedicated alternate host
    ///
    /// An absent alternate host always means "use the app's own base URL".
    #[must_use]
    pub fn with_alternate_login_host(mut self, host: Url) -> Self {
        self.alternate_login_host = Some(host);
        self
    }
}
