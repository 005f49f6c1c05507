//! Extension registration.
//!
//! Legacy mode configures each extension that the viewhost supports and the
//! document requests, synchronously. Mediated mode grants, initializes and
//! loads extensions through an [`ExtensionMediator`], then waits on a
//! condition variable for the load callback, bounded by a timeout.
//!
//! # Invariants
//!
//! - A mediated load returns within the timeout plus scheduling slack,
//!   whether or not the callback ever fires.
//! - The load callback only touches the shared [`LoadSignal`]; a callback
//!   firing after the wait gave up is harmless.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use parking_lot::{Condvar, Mutex};

use crate::{
    config::{RootConfig, SupportedExtension},
    engine::{Content, ExtensionFlags, ExtensionGrant, ExtensionMediator, LegacyExtension},
};

/// Error sent to the viewhost when the load callback never fired.
pub const LOAD_TIMEOUT_MESSAGE: &str =
    "Timed out waiting for extensions to load. Some extensions may not be loaded.";

/// Error sent to the viewhost when the mediator reported failure.
pub const LOAD_FAILED_MESSAGE: &str = "Required extension loading failed.";

/// Result of a registration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionOutcome {
    /// Every extension registered or loaded
    Loaded,
    /// The mediator reported a failed load
    Failed,
    /// The load callback did not fire within the timeout
    TimedOut,
}

impl ExtensionOutcome {
    /// Loaded successfully and not timed out.
    pub fn is_success(self) -> bool {
        self == Self::Loaded
    }

    /// Error string for the viewhost, if any.
    pub fn viewhost_message(self) -> Option<&'static str> {
        match self {
            Self::Loaded => None,
            Self::Failed => Some(LOAD_FAILED_MESSAGE),
            Self::TimedOut => Some(LOAD_TIMEOUT_MESSAGE),
        }
    }
}

#[derive(Default)]
struct LoadState {
    finished: bool,
    failed: bool,
}

/// Completion flag shared with the mediator's load callback.
#[derive(Default)]
struct LoadSignal {
    state: Mutex<LoadState>,
    loaded: Condvar,
}

impl LoadSignal {
    fn complete(&self, success: bool) {
        let mut state = self.state.lock();
        state.finished = true;
        state.failed = !success;
        self.loaded.notify_all();
    }

    fn wait(&self, timeout: Duration) -> ExtensionOutcome {
        let mut state = self.state.lock();
        let result = self.loaded.wait_while_for(&mut state, |state| !state.finished, timeout);
        if result.timed_out() && !state.finished {
            ExtensionOutcome::TimedOut
        } else if state.failed {
            ExtensionOutcome::Failed
        } else {
            ExtensionOutcome::Loaded
        }
    }
}

/// Extensions available to documents.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    legacy: BTreeMap<String, Arc<dyn LegacyExtension>>,
    mediator: Option<Arc<dyn ExtensionMediator>>,
}

impl ExtensionRegistry {
    /// Legacy registry with no extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry loading extensions through `mediator`.
    pub fn mediated(mediator: Arc<dyn ExtensionMediator>) -> Self {
        Self { legacy: BTreeMap::new(), mediator: Some(mediator) }
    }

    /// Add a legacy extension.
    #[must_use]
    pub fn with_legacy(mut self, extension: Arc<dyn LegacyExtension>) -> Self {
        self.legacy.insert(extension.uri().to_string(), extension);
        self
    }

    /// Extensions go through the mediator.
    pub fn is_mediated(&self) -> bool {
        self.mediator.is_some()
    }

    /// Mediator, in mediated mode.
    pub fn mediator(&self) -> Option<&Arc<dyn ExtensionMediator>> {
        self.mediator.as_ref()
    }

    /// Register the document's extensions with whichever protocol is active.
    pub fn register(
        &self,
        supported: &[SupportedExtension],
        content: &dyn Content,
        config: &mut RootConfig,
        timeout: Duration,
    ) -> ExtensionOutcome {
        match &self.mediator {
            Some(mediator) => {
                config.mediated_extensions = true;
                load_mediated(mediator.as_ref(), supported, content, timeout)
            },
            None => {
                self.register_legacy(supported, content, config);
                ExtensionOutcome::Loaded
            },
        }
    }

    fn register_legacy(
        &self,
        supported: &[SupportedExtension],
        content: &dyn Content,
        config: &mut RootConfig,
    ) {
        let requested = content.requested_extensions();
        for extension in supported {
            if !requested.contains(&extension.uri) {
                continue;
            }
            let Some(legacy) = self.legacy.get(&extension.uri) else {
                continue;
            };
            legacy.apply_settings(&content.extension_settings(&extension.uri));
            config.registered_extensions.insert(extension.uri.clone());
            tracing::debug!(uri = %extension.uri, "registered legacy extension");
        }
    }
}

fn load_mediated(
    mediator: &dyn ExtensionMediator,
    supported: &[SupportedExtension],
    content: &dyn Content,
    timeout: Duration,
) -> ExtensionOutcome {
    let requested = content.requested_extensions();
    let mut flags = ExtensionFlags::new();
    let mut granted = Vec::new();
    for extension in supported {
        if !extension.flags.is_null() {
            flags.insert(extension.uri.clone(), extension.flags.clone());
        }
        if requested.contains(&extension.uri) && mediator.has_extension(&extension.uri) {
            granted.push(extension.uri.clone());
        }
    }

    let grant = |uri: &str| {
        if granted.iter().any(|g| g == uri) {
            ExtensionGrant::Granted
        } else {
            ExtensionGrant::Denied
        }
    };
    mediator.initialize_extensions(&flags, content, &grant);

    let signal = Arc::new(LoadSignal::default());
    let callback_signal = Arc::clone(&signal);
    mediator.load_extensions(
        &flags,
        content,
        Box::new(move |success| callback_signal.complete(success)),
    );

    let outcome = signal.wait(timeout);
    match outcome {
        ExtensionOutcome::Loaded => tracing::debug!(granted = granted.len(), "extensions loaded"),
        ExtensionOutcome::Failed => tracing::error!("required extension loading failed"),
        ExtensionOutcome::TimedOut => {
            tracing::error!(timeout_ms = timeout.as_millis() as u64, "timed out waiting for extensions");
        },
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn completed_before_wait() {
        let signal = LoadSignal::default();
        signal.complete(true);
        assert_eq!(signal.wait(Duration::from_millis(1)), ExtensionOutcome::Loaded);
    }

    #[test]
    fn failure_reported() {
        let signal = LoadSignal::default();
        signal.complete(false);
        assert_eq!(signal.wait(Duration::from_millis(1)), ExtensionOutcome::Failed);
    }

    #[test]
    fn no_callback_times_out() {
        let signal = LoadSignal::default();
        assert_eq!(signal.wait(Duration::from_millis(20)), ExtensionOutcome::TimedOut);
    }

    #[test]
    fn callback_from_foreign_thread() {
        let signal = Arc::new(LoadSignal::default());
        let remote = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.complete(true);
        });
        assert_eq!(signal.wait(Duration::from_secs(5)), ExtensionOutcome::Loaded);
        handle.join().expect("callback thread");
    }

    #[test]
    fn only_loaded_is_success() {
        assert!(ExtensionOutcome::Loaded.is_success());
        assert!(!ExtensionOutcome::Failed.is_success());
        assert!(!ExtensionOutcome::TimedOut.is_success());
        assert_eq!(ExtensionOutcome::TimedOut.viewhost_message(), Some(LOAD_TIMEOUT_MESSAGE));
    }
}
