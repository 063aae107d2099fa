//! External agent launching
//!
//! The login UI renders in a user agent the orchestrator does not control:
//! an isolated browser tab when the host platform can bind one, a plain
//! browser otherwise. The upgrade is best-effort only; flow correctness
//! never depends on which surface was used, only on the eventual redirect.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Which user-agent surface a navigation request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSurface {
    /// Isolated browser tab bound through a [`TabHost`] capability
    IsolatedTab,

    /// Full browser fallback
    Browser,
}

/// A request for the hosting environment to open the authorization URI
///
/// The orchestrator hands this out once and never assumes the agent will
/// respond; every resumption path re-validates its own assumptions instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Surface the request should open on
    pub surface: AgentSurface,

    /// Provider authorization URI to open
    pub uri: Url,
}

/// A live connection to the isolated-tab service
///
/// Dropping the binding releases the underlying service connection.
pub trait TabBinding: Send {
    /// Give the tab service a head start on the upcoming navigation
    fn warm_up(&mut self) {}
}

/// Capability to bind an isolated-tab service on the host platform
pub trait TabHost: Send + Sync {
    /// Attempt to bind; `None` when the capability is absent or refuses
    fn bind(&self) -> Option<Box<dyn TabBinding>>;
}

/// Launcher owning the bound tab-service connection for one flow
///
/// Scoped acquisition contract: the binding is acquired before the first
/// navigation request and released exactly once on [`release`] or drop,
/// regardless of which outcome path the flow takes.
///
/// [`release`]: AgentLauncher::release
pub struct AgentLauncher {
    host: Arc<dyn TabHost>,
    binding: Option<Box<dyn TabBinding>>,
    released: bool,
}

impl AgentLauncher {
    /// Create a launcher over the platform's tab capability
    #[must_use]
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self { host, binding: None, released: false }
    }

    /// Build the open request for an authorization URI
    ///
    /// Binds the isolated-tab service on first use. When binding fails or
    /// the launcher was already released, falls back to a plain browser
    /// request.
    pub fn navigation_request(&mut self, uri: Url) -> NavigationRequest {
        if self.binding.is_none() && !self.released {
            self.binding = self.host.bind();
            match self.binding.as_mut() {
                Some(binding) => {
                    binding.warm_up();
                    debug!("bound isolated tab service");
                }
                None => debug!("isolated tab service unavailable, falling back to browser"),
            }
        }

        let surface = if self.binding.is_some() {
            AgentSurface::IsolatedTab
        } else {
            AgentSurface::Browser
        };

        NavigationRequest { surface, uri }
    }

    /// Whether a tab-service binding is currently held
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Release the bound service connection
    ///
    /// Idempotent: the connection is dropped on the first call only, and a
    /// released launcher never rebinds.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        if self.binding.take().is_some() {
            debug!("released isolated tab service binding");
        }
        self.released = true;
    }
}

impl Drop for AgentLauncher {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for AgentLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentLauncher")
            .field("bound", &self.binding.is_some())
            .field("released", &self.released)
            .finish()
    }
}

/// Installation-scoped identifier keying launcher ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstallationId(Uuid);

impl InstallationId {
    /// Generate a fresh installation identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstallationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Explicitly owned registry of launchers, keyed by installation
///
/// Replaces a process-wide static handle: the embedding application creates
/// the registry, passes it by reference to whatever needs it, and tears it
/// down when done. A rebind for a key releases the previous binding first;
/// two simultaneous flows never share one binding.
#[derive(Default)]
pub struct LauncherRegistry {
    inner: Mutex<HashMap<InstallationId, AgentLauncher>>,
}

impl LauncherRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a launcher for an installation (release-and-rebind)
    ///
    /// Any launcher previously registered under `id` is released before the
    /// new one takes its place.
    pub fn register(&self, id: InstallationId, host: Arc<dyn TabHost>) {
        let mut inner = self.inner.lock();
        if let Some(mut previous) = inner.insert(id, AgentLauncher::new(host)) {
            previous.release();
            debug!(%id, "replaced existing launcher registration");
        }
    }

    /// Run `f` against the launcher registered under `id`
    ///
    /// Returns `None` when no launcher is registered for the installation.
    pub fn with_launcher<R>(
        &self,
        id: InstallationId,
        f: impl FnOnce(&mut AgentLauncher) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock();
        inner.get_mut(&id).map(f)
    }

    /// Release and remove the launcher for an installation
    ///
    /// Returns `true` if a launcher was registered.
    pub fn release(&self, id: InstallationId) -> bool {
        let mut inner = self.inner.lock();
        match inner.remove(&id) {
            Some(mut launcher) => {
                launcher.release();
                true
            }
            None => false,
        }
    }

    /// Release every registered launcher
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        for (_, mut launcher) in inner.drain() {
            launcher.release();
        }
    }

    /// Number of registered launchers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for launcher.
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Tab host whose bindings count acquisitions and releases
    struct CountingHost {
        available: bool,
        binds: Arc<AtomicUsize>,
        drops: Arc<AtomicUsize>,
        warm_ups: Arc<AtomicUsize>,
    }

    struct CountingBinding {
        drops: Arc<AtomicUsize>,
        warm_ups: Arc<AtomicUsize>,
    }

    impl TabBinding for CountingBinding {
        fn warm_up(&mut self) {
            self.warm_ups.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for CountingBinding {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl TabHost for CountingHost {
        fn bind(&self) -> Option<Box<dyn TabBinding>> {
            if !self.available {
                return None;
            }
            self.binds.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(CountingBinding {
                drops: self.drops.clone(),
                warm_ups: self.warm_ups.clone(),
            }))
        }
    }

    fn counting_host(available: bool) -> (Arc<CountingHost>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let binds = Arc::new(AtomicUsize::new(0));
        let drops = Arc::new(AtomicUsize::new(0));
        let host = Arc::new(CountingHost {
            available,
            binds: binds.clone(),
            drops: drops.clone(),
            warm_ups: Arc::new(AtomicUsize::new(0)),
        });
        (host, binds, drops)
    }

    fn uri() -> Url {
        Url::parse("https://myapp.example.net/.auth/login/google").unwrap()
    }

    /// Validates `AgentLauncher::navigation_request` behavior for the
    /// isolated tab scenario.
    ///
    /// Assertions:
    /// - Confirms the surface is `IsolatedTab` when the host binds.
    /// - Confirms the binding is acquired once and warmed up.
    #[test]
    fn test_isolated_tab_surface() {
        let (host, binds, _) = counting_host(true);
        let warm_ups = host.warm_ups.clone();
        let mut launcher = AgentLauncher::new(host);

        let request = launcher.navigation_request(uri());
        assert_eq!(request.surface, AgentSurface::IsolatedTab);
        assert_eq!(request.uri, uri());
        assert!(launcher.is_bound());

        // Second request reuses the binding
        let request = launcher.navigation_request(uri());
        assert_eq!(request.surface, AgentSurface::IsolatedTab);
        assert_eq!(binds.load(Ordering::SeqCst), 1);
        assert_eq!(warm_ups.load(Ordering::SeqCst), 1);
    }

    /// Validates `AgentLauncher::navigation_request` behavior for the
    /// browser fallback scenario.
    ///
    /// Assertions:
    /// - Confirms the surface degrades to `Browser` when binding fails.
    #[test]
    fn test_browser_fallback() {
        let (host, _, _) = counting_host(false);
        let mut launcher = AgentLauncher::new(host);

        let request = launcher.navigation_request(uri());
        assert_eq!(request.surface, AgentSurface::Browser);
        assert!(!launcher.is_bound());
    }

    /// Validates `AgentLauncher::release` behavior for the scoped
    /// acquisition scenario.
    ///
    /// Assertions:
    /// - Confirms the binding drops exactly once across repeated releases
    ///   and the final drop of the launcher.
    /// - Confirms a released launcher never rebinds.
    #[test]
    fn test_release_exactly_once() {
        let (host, binds, drops) = counting_host(true);
        let mut launcher = AgentLauncher::new(host);

        launcher.navigation_request(uri());
        launcher.release();
        launcher.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        // Released launchers fall back to the browser instead of rebinding
        let request = launcher.navigation_request(uri());
        assert_eq!(request.surface, AgentSurface::Browser);
        assert_eq!(binds.load(Ordering::SeqCst), 1);

        drop(launcher);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    /// Validates `AgentLauncher` drop behavior for the abandoned flow
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms dropping an undisposed launcher releases its binding.
    #[test]
    fn test_drop_releases_binding() {
        let (host, _, drops) = counting_host(true);
        {
            let mut launcher = AgentLauncher::new(host);
            launcher.navigation_request(uri());
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    /// Validates `LauncherRegistry::register` behavior for the
    /// release-and-rebind scenario.
    ///
    /// Assertions:
    /// - Confirms re-registering the same installation releases the previous
    ///   binding before the new launcher takes over.
    #[test]
    fn test_registry_release_and_rebind() {
        let registry = LauncherRegistry::new();
        let id = InstallationId::new();

        let (first_host, _, first_drops) = counting_host(true);
        registry.register(id, first_host);
        registry
            .with_launcher(id, |launcher| {
                launcher.navigation_request(uri());
            })
            .expect("launcher registered");

        let (second_host, _, _) = counting_host(true);
        registry.register(id, second_host);

        assert_eq!(first_drops.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    /// Validates `LauncherRegistry::teardown` behavior for the shutdown
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms every registered binding is released and the registry
    ///   empties.
    #[test]
    fn test_registry_teardown() {
        let registry = LauncherRegistry::new();

        let (host_a, _, drops_a) = counting_host(true);
        let (host_b, _, drops_b) = counting_host(true);
        let id_a = InstallationId::new();
        let id_b = InstallationId::new();
        registry.register(id_a, host_a);
        registry.register(id_b, host_b);

        registry.with_launcher(id_a, |l| {
            l.navigation_request(uri());
        });
        registry.with_launcher(id_b, |l| {
            l.navigation_request(uri());
        });

        registry.teardown();
        assert!(registry.is_empty());
        assert_eq!(drops_a.load(Ordering::SeqCst), 1);
        assert_eq!(drops_b.load(Ordering::SeqCst), 1);
    }

    /// Validates `LauncherRegistry::release` behavior for the unknown
    /// installation scenario.
    ///
    /// Assertions:
    /// - Ensures releasing an unregistered installation reports `false`.
    #[test]
    fn test_registry_release_unknown() {
        let registry = LauncherRegistry::new();
        assert!(!registry.release(InstallationId::new()));
    }
}
