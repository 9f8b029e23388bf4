//! Theme preference state machine.
//!
//! DESIGN
//! ======
//! A fixed three-mode cycle (light, dark, system) with the active mode
//! persisted under a single storage key. The *resolved* value — is dark
//! actually in effect — is always derived from the mode plus the live
//! system signal, never stored on its own. Storage, signal, and
//! presentation are injected so the machine stays host-agnostic; a browser
//! shim wires `localStorage`, the media query, and the document root to it
//! and calls [`ThemeToggle::on_attach`] / [`ThemeToggle::on_detach`] from
//! its own lifecycle hooks.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures are logged and absorbed: the component keeps the mode
//! in memory for the rest of the session. Unrecognized mode strings are
//! warn-level no-ops.

use std::sync::Arc;

use tracing::warn;

use crate::signal::SystemSignal;
use crate::storage::KeyValueStore;

/// Storage key holding the serialized mode name.
pub const THEME_STORAGE_KEY: &str = "theme-preference";

/// User-selected theme mode, distinct from the resolved dark/light value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
    /// Follow the live system signal.
    #[default]
    System,
}

impl ThemeMode {
    /// Serialized form used in storage and change notifications.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// Parse a serialized mode name. Unknown strings yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Next mode in the cycle: light → dark → system → light.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::System,
            Self::System => Self::Light,
        }
    }
}

/// Payload delivered to subscribers on every theme change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeChange {
    pub mode: ThemeMode,
    /// Resolved value at the time of the change.
    pub dark: bool,
}

/// Document-level presentation hook. The browser shim toggles root marker
/// classes and the meta theme-color hint here.
pub trait ThemePresenter {
    fn apply(&self, dark: bool);
}

/// Theme preference component.
///
/// Construction reads the persisted mode (defaulting to
/// [`ThemeMode::System`] when absent or unrecognized); transitions persist
/// immediately, re-apply presentation, and notify subscribers.
pub struct ThemeToggle {
    storage: Arc<dyn KeyValueStore>,
    signal: Arc<dyn SystemSignal>,
    presenter: Option<Box<dyn ThemePresenter>>,
    mode: ThemeMode,
    subscribers: Vec<Box<dyn Fn(&ThemeChange)>>,
}

impl ThemeToggle {
    /// Create the component, loading the persisted mode if one exists.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, signal: Arc<dyn SystemSignal>) -> Self {
        let mode = load_mode(storage.as_ref());
        Self { storage, signal, presenter: None, mode, subscribers: Vec::new() }
    }

    /// Install the presentation hook. Applied on attach and on every
    /// subsequent change.
    pub fn set_presenter(&mut self, presenter: Box<dyn ThemePresenter>) {
        self.presenter = Some(presenter);
    }

    /// Register a change subscriber. Delivery order across subscribers is
    /// not part of the contract.
    pub fn subscribe(&mut self, subscriber: Box<dyn Fn(&ThemeChange)>) {
        self.subscribers.push(subscriber);
    }

    /// Host lifecycle: the component is now live. Applies the current
    /// resolved value so presentation matches state from the first frame.
    pub fn on_attach(&self) {
        self.apply_presentation();
    }

    /// Host lifecycle: the component is going away. The host drops its
    /// signal listener; nothing to tear down internally.
    pub fn on_detach(&self) {}

    /// Current mode. No side effects.
    #[must_use]
    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    /// Resolved value: whether dark is in effect right now. For
    /// [`ThemeMode::System`] this consults the live signal at call time.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        match self.mode {
            ThemeMode::Dark => true,
            ThemeMode::Light => false,
            ThemeMode::System => self.signal.is_dark(),
        }
    }

    /// Advance to the next mode in the cycle. Always succeeds.
    pub fn cycle(&mut self) {
        self.transition(self.mode.next());
    }

    /// Jump directly to `mode`.
    pub fn set_mode(&mut self, mode: ThemeMode) {
        self.transition(mode);
    }

    /// Set the mode from a serialized name. Unrecognized values are a
    /// warn-level no-op, mirroring untrusted host input.
    pub fn set_mode_str(&mut self, value: &str) {
        match ThemeMode::parse(value) {
            Some(mode) => self.transition(mode),
            None => warn!(value, "ignoring unrecognized theme mode"),
        }
    }

    /// The live system signal flipped. Only meaningful in
    /// [`ThemeMode::System`]: the mode is unchanged but the resolved value
    /// may not be, so presentation is re-applied and subscribers notified.
    pub fn on_system_change(&self) {
        if self.mode == ThemeMode::System {
            self.apply_presentation();
            self.notify();
        }
    }

    fn transition(&mut self, mode: ThemeMode) {
        self.mode = mode;
        if let Err(e) = self.storage.set(THEME_STORAGE_KEY, mode.as_str()) {
            warn!(error = %e, "failed to persist theme preference; continuing in memory");
        }
        self.apply_presentation();
        self.notify();
    }

    fn apply_presentation(&self) {
        if let Some(presenter) = &self.presenter {
            presenter.apply(self.is_dark());
        }
    }

    fn notify(&self) {
        let change = ThemeChange { mode: self.mode, dark: self.is_dark() };
        for subscriber in &self.subscribers {
            subscriber(&change);
        }
    }
}

fn load_mode(storage: &dyn KeyValueStore) -> ThemeMode {
    match storage.get(THEME_STORAGE_KEY) {
        Ok(Some(value)) => ThemeMode::parse(&value).unwrap_or_else(|| {
            warn!(value, "stored theme preference unrecognized; defaulting to system");
            ThemeMode::System
        }),
        Ok(None) => ThemeMode::System,
        Err(e) => {
            warn!(error = %e, "failed to load theme preference; defaulting to system");
            ThemeMode::System
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
