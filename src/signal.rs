//! Live system signal boundary.
//!
//! The browser equivalent is a `prefers-color-scheme: dark` media query.
//! Components read the signal at evaluation time and are told about flips
//! by the host shim calling their change handler; the signal itself carries
//! no listener machinery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A live, read-only environment signal (OS color-scheme preference).
pub trait SystemSignal: Send + Sync {
    /// Current value of the signal. `true` means the dark-like scheme.
    fn is_dark(&self) -> bool;
}

/// Settable [`SystemSignal`] backed by a shared flag. The host shim (or a
/// test) flips it and then invokes the component's change handler, standing
/// in for a media-query change event.
#[derive(Clone, Default)]
pub struct SharedSignal {
    dark: Arc<AtomicBool>,
}

impl SharedSignal {
    #[must_use]
    pub fn new(dark: bool) -> Self {
        Self { dark: Arc::new(AtomicBool::new(dark)) }
    }

    /// Flip the signal. Callers are responsible for notifying components.
    pub fn set_dark(&self, dark: bool) {
        self.dark.store(dark, Ordering::Relaxed);
    }
}

impl SystemSignal for SharedSignal {
    fn is_dark(&self) -> bool {
        self.dark.load(Ordering::Relaxed)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "signal_test.rs"]
mod tests;
