//! Test fixtures for integration tests
#![allow(dead_code)]
//!
//! Reusable pieces shared by the flow integration tests: a stub tab host, a
//! completion callback that records every delivery, and tracing setup.

use std::sync::{Arc, Once};

use easyauth_client::{CompletionCallback, LoginOutcome, TabBinding, TabHost};
use parking_lot::Mutex;

/// Install a test tracing subscriber once per process
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// No-op tab binding
pub struct StubBinding;

impl TabBinding for StubBinding {}

/// Tab host that always grants an isolated-tab binding
pub struct StubTabHost;

impl TabHost for StubTabHost {
    fn bind(&self) -> Option<Box<dyn TabBinding>> {
        Some(Box::new(StubBinding))
    }
}

/// Tab host without the isolated-tab capability
pub struct BrowserOnlyHost;

impl TabHost for BrowserOnlyHost {
    fn bind(&self) -> Option<Box<dyn TabBinding>> {
        None
    }
}

pub type RecordedOutcomes = Arc<Mutex<Vec<LoginOutcome>>>;

/// Completion callback pushing every delivery into a shared vector
pub fn outcome_recorder() -> (CompletionCallback, RecordedOutcomes) {
    let outcomes: RecordedOutcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = outcomes.clone();
    (Box::new(move |outcome| sink.lock().push(outcome)), outcomes)
}
