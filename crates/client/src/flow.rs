//! Login flow orchestrator
//!
//! The state machine tying verifier generation, URI construction, agent
//! launch, redirect validation, and code exchange together. The flow is
//! quiescent across its two suspension points (agent in foreground, exchange
//! in flight) and produces exactly one terminal outcome per instance.
//!
//! The hosting process may be torn down while the external agent shows UI;
//! [`LoginFlow::suspended_state`] and [`LoginFlow::rehydrate`] carry the
//! attempt across that boundary. Every resumption path re-validates its own
//! assumptions instead of trusting prior in-memory state.

use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ErrorKind, LoginError, LoginResult};
use crate::exchange::CodeExchange;
use crate::launcher::{AgentLauncher, NavigationRequest};
use crate::pkce::CodeVerifier;
use crate::redirect;
use crate::state::LoginFlowState;
use crate::types::{AuthenticatedUser, ClientConfig, LoginOutcome};
use crate::uri::{build_login_uri, normalize_provider};

/// Completion callback receiving the flow's single terminal outcome
pub type CompletionCallback = Box<dyn FnOnce(LoginOutcome) + Send>;

/// Phase of a login flow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// Created, nothing launched yet
    Idle,

    /// Navigation handed to the external agent; waiting for the redirect
    AwaitingRedirect,

    /// Redirect guards passed; code exchange in flight
    ExchangingCode,

    /// Terminal: outcome delivered with an authenticated user
    Completed,

    /// Terminal: outcome delivered with the recorded failure
    Failed(ErrorKind),
}

impl FlowPhase {
    /// Whether this phase is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// One browser-mediated login attempt
///
/// Single-instance per attempt: transitions are strictly sequential, the
/// exchange only runs after the redirect guards pass, and the completion
/// callback fires at most once. Concurrent attempts from the same caller are
/// rejected; serialize them at a higher layer.
pub struct LoginFlow<E: CodeExchange> {
    config: ClientConfig,
    exchanger: E,
    on_complete: Option<CompletionCallback>,
    phase: FlowPhase,
    state: Option<LoginFlowState>,
    navigated: bool,
    outcome: Option<LoginOutcome>,
}

impl<E: CodeExchange> LoginFlow<E> {
    /// Create a new idle flow
    #[must_use]
    pub fn new(config: ClientConfig, exchanger: E, on_complete: CompletionCallback) -> Self {
        Self {
            config,
            exchanger,
            on_complete: Some(on_complete),
            phase: FlowPhase::Idle,
            state: None,
            navigated: false,
            outcome: None,
        }
    }

    /// Begin the attempt: generate the verifier, capture state, and build
    /// the navigation request for the external agent
    ///
    /// On success the flow enters `AwaitingRedirect` and the caller opens
    /// the returned request; [`suspended_state`] should be persisted before
    /// handing control to the agent.
    ///
    /// # Errors
    /// A builder failure transitions to `Failed(Launch)`, delivers the
    /// outcome, and returns the error. Calling `begin` on a non-idle flow
    /// returns [`LoginError::Authentication`] without disturbing the
    /// attempt in progress.
    ///
    /// [`suspended_state`]: LoginFlow::suspended_state
    pub fn begin(
        &mut self,
        provider: &str,
        uri_scheme: &str,
        extra_params: &[(String, String)],
        launcher: &mut AgentLauncher,
    ) -> LoginResult<NavigationRequest> {
        if self.phase != FlowPhase::Idle {
            return Err(LoginError::Authentication);
        }

        let provider = normalize_provider(provider);

        let verifier = match CodeVerifier::generate() {
            Ok(verifier) => verifier,
            Err(error) => {
                self.fail(&error);
                return Err(error);
            }
        };

        let uri =
            match build_login_uri(&provider, uri_scheme, extra_params, &verifier, &self.config) {
                Ok(uri) => uri,
                Err(error) => {
                    self.fail(&error);
                    return Err(error);
                }
            };

        self.state = Some(LoginFlowState::new(uri_scheme, &verifier, &provider, &self.config));
        let request = launcher.navigation_request(uri);
        self.navigated = true;
        self.phase = FlowPhase::AwaitingRedirect;
        info!(provider, surface = ?request.surface, "login flow awaiting redirect");

        Ok(request)
    }

    /// Serialized flow state for persistence across the suspension boundary
    ///
    /// # Errors
    /// Returns [`LoginError::StateLost`] when the flow holds no state (not
    /// begun, or already terminal).
    pub fn suspended_state(&self) -> LoginResult<String> {
        match &self.state {
            Some(state) => state.to_json(),
            None => Err(LoginError::StateLost("no login attempt in flight".to_owned())),
        }
    }

    /// Reconstruct a flow from its persisted state after a host teardown
    ///
    /// The rebuilt flow is in `AwaitingRedirect`, marked as having
    /// navigated, and equivalent field-for-field to the suspended one.
    ///
    /// # Errors
    /// Fails closed with [`LoginError::StateLost`] when the payload is
    /// malformed or its captured URLs no longer parse.
    pub fn rehydrate(
        json: &str,
        exchanger: E,
        on_complete: CompletionCallback,
    ) -> LoginResult<Self> {
        let state = LoginFlowState::from_json(json)?;

        let app_url = Url::parse(state.app_url())
            .map_err(|e| LoginError::StateLost(format!("persisted application URL: {e}")))?;
        let mut config = ClientConfig::new(app_url);
        if let Some(prefix) = state.login_uri_prefix() {
            config = config.with_login_uri_prefix(prefix);
        }
        if let Some(host) = state.alternate_login_host() {
            let host = Url::parse(host)
                .map_err(|e| LoginError::StateLost(format!("persisted login host: {e}")))?;
            config = config.with_alternate_login_host(host);
        }

        debug!("login flow rehydrated from persisted state");
        Ok(Self {
            config,
            exchanger,
            on_complete: Some(on_complete),
            phase: FlowPhase::AwaitingRedirect,
            state: Some(state),
            navigated: true,
            outcome: None,
        })
    }

    /// Resume the flow with the redirect envelope from the external agent
    ///
    /// Guards run in order: pending navigation, envelope presence, redirect
    /// origin, authorization code presence. Any guard failure is terminal
    /// and never silently retried. When the guards pass the flow enters
    /// `ExchangingCode` and the exchange result decides the terminal phase.
    ///
    /// Once terminal, further calls are no-ops returning the recorded
    /// outcome without invoking the callback again.
    pub async fn resume_with_redirect(&mut self, envelope: Option<&str>) -> LoginOutcome {
        if let Some(outcome) = &self.outcome {
            debug!("resume after terminal state ignored");
            return outcome.clone();
        }

        // Spurious resume: nothing was ever launched, or state is gone
        let Some(state) = self.state.clone() else {
            return self.fail(&LoginError::Authentication);
        };
        if !self.navigated {
            return self.fail(&LoginError::Authentication);
        }
        let Some(envelope) = envelope else {
            return self.fail(&LoginError::Authentication);
        };

        if !redirect::accepts(envelope, state.uri_scheme()) {
            return self.fail(&LoginError::InvalidRedirect(envelope.to_owned()));
        }
        let Some(code) = redirect::authorization_code(envelope) else {
            return self.fail(&LoginError::MissingCode);
        };

        self.phase = FlowPhase::ExchangingCode;
        debug!("redirect validated, exchanging authorization code");

        match self.exchanger.exchange(&state, &code).await {
            Ok(user) => self.complete(user),
            Err(error) => self.fail(&error),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    /// Recorded terminal outcome, if the flow has finished
    #[must_use]
    pub fn outcome(&self) -> Option<&LoginOutcome> {
        self.outcome.as_ref()
    }

    fn complete(&mut self, user: AuthenticatedUser) -> LoginOutcome {
        info!(user_id = user.user_id.as_str(), "login flow completed");
        self.phase = FlowPhase::Completed;
        self.state = None;
        self.deliver(LoginOutcome::Success(user))
    }

    fn fail(&mut self, error: &LoginError) -> LoginOutcome {
        warn!(error = %error, "login flow failed");
        self.phase = FlowPhase::Failed(error.kind());
        self.state = None;
        self.deliver(LoginOutcome::failure(error))
    }

    /// Record the terminal outcome and fire the callback exactly once
    fn deliver(&mut self, outcome: LoginOutcome) -> LoginOutcome {
        if let Some(callback) = self.on_complete.take() {
            callback(outcome.clone());
        }
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl<E: CodeExchange> std::fmt::Debug for LoginFlow<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("phase", &self.phase)
            .field("navigated", &self.navigated)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}
