//! Browser-mediated Easy Auth login client.
//!
//! Drives an OAuth2 authorization-code-with-PKCE login through an external
//! user agent (an isolated browser tab when the platform offers one, the
//! default browser otherwise). The crate owns everything except the pixels:
//! verifier and challenge generation, authorization URI construction, agent
//! launch and teardown, redirect validation, authorization code extraction,
//! and the final code-for-token exchange.
//!
//! # Flow shape
//!
//! ```text
//! begin() ── agent shows provider UI ── redirect ── resume_with_redirect()
//!    │                                                      │
//!    └── suspended_state() ── host torn down ── rehydrate() ┘
//! ```
//!
//! [`LoginFlow`] is the entry point; one instance is one attempt, with one
//! terminal [`LoginOutcome`] delivered exactly once.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod exchange;
pub mod flow;
pub mod launcher;
pub mod pkce;
pub mod redirect;
pub mod state;
pub mod types;
pub mod uri;

// Re-export the types a host application touches on the happy path
// ------------------------
pub use error::{ErrorKind, LoginError, LoginResult};
pub use exchange::{CodeExchange, CodeExchangeClient};
pub use flow::{CompletionCallback, FlowPhase, LoginFlow};
pub use launcher::{
    AgentLauncher, AgentSurface, InstallationId, LauncherRegistry, NavigationRequest, TabBinding,
    TabHost,
};
pub use pkce::CodeVerifier;
pub use state::LoginFlowState;
pub use types::{AuthenticatedUser, ClientConfig, LoginOutcome};
