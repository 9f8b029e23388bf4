//! Cookie consent state machine.
//!
//! DESIGN
//! ======
//! Two-screen dialog flow: a summary view (accept all / accept necessary /
//! customize) and a detail view (per-category checkboxes + save). The
//! summary→detail step is a pure view reveal; only a save transition
//! changes state. Saves always force `necessary = true`, persist the full
//! object wholesale (never a merge), hide the dialog, and notify
//! subscribers. When a stored object already exists the dialog is never
//! shown: attach emits [`ConsentEvent::Loaded`] with the stored values and
//! the decision future is already resolved.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::storage::KeyValueStore;

/// Storage key holding the JSON-serialized preference object.
pub const CONSENT_STORAGE_KEY: &str = "cookie-preferences";

fn default_true() -> bool {
    true
}

/// Per-category consent choices. `necessary` is fixed true; a stored
/// object that claims otherwise is corrected on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    #[serde(default = "default_true")]
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub preferences: bool,
    #[serde(default)]
    pub marketing: bool,
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self { necessary: true, analytics: false, preferences: false, marketing: false }
    }
}

impl ConsentPreferences {
    /// Every category granted.
    #[must_use]
    pub fn all() -> Self {
        Self { necessary: true, analytics: true, preferences: true, marketing: true }
    }

    /// Whether the named category is granted. Unknown categories are
    /// never granted.
    #[must_use]
    pub fn is_allowed(&self, category: &str) -> bool {
        match category {
            "necessary" => self.necessary,
            "analytics" => self.analytics,
            "preferences" => self.preferences,
            "marketing" => self.marketing,
            _ => false,
        }
    }
}

/// Which dialog screen is visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConsentView {
    #[default]
    Hidden,
    Summary,
    Detail,
}

/// Notification delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsentEvent {
    /// A previously stored choice was loaded at attach time.
    Loaded(ConsentPreferences),
    /// The user saved a choice.
    Changed(ConsentPreferences),
}

/// Cookie consent component.
pub struct ConsentBanner {
    storage: Arc<dyn KeyValueStore>,
    prefs: ConsentPreferences,
    stored_choice: bool,
    view: ConsentView,
    subscribers: Vec<Box<dyn Fn(&ConsentEvent)>>,
    decided: watch::Sender<Option<ConsentPreferences>>,
}

impl ConsentBanner {
    /// Create the component, loading a previously stored choice if one
    /// exists. The decision future resolves immediately in that case.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let loaded = load_preferences(storage.as_ref());
        let stored_choice = loaded.is_some();
        let prefs = loaded.unwrap_or_default();
        let decided = watch::Sender::new(stored_choice.then(|| prefs.clone()));
        Self { storage, prefs, stored_choice, view: ConsentView::Hidden, subscribers: Vec::new(), decided }
    }

    /// Register an event subscriber. Delivery order across subscribers is
    /// not part of the contract.
    pub fn subscribe(&mut self, subscriber: Box<dyn Fn(&ConsentEvent)>) {
        self.subscribers.push(subscriber);
    }

    /// Host lifecycle: the component is now live. Either announces the
    /// stored choice or reveals the summary prompt.
    pub fn on_attach(&mut self) {
        if self.stored_choice {
            self.notify(&ConsentEvent::Loaded(self.prefs.clone()));
        } else {
            self.view = ConsentView::Summary;
        }
    }

    /// Host lifecycle counterpart to [`ConsentBanner::on_attach`].
    pub fn on_detach(&self) {}

    /// Whether the named category is currently granted.
    #[must_use]
    pub fn is_allowed(&self, category: &str) -> bool {
        self.prefs.is_allowed(category)
    }

    /// Currently effective preferences.
    #[must_use]
    pub fn preferences(&self) -> &ConsentPreferences {
        &self.prefs
    }

    /// Which dialog screen is showing.
    #[must_use]
    pub fn view(&self) -> ConsentView {
        self.view
    }

    /// Summary → detail reveal. Pure view change, no state transition.
    pub fn customize(&mut self) {
        if self.view == ConsentView::Summary {
            self.view = ConsentView::Detail;
        }
    }

    /// Grant every category.
    pub fn accept_all(&mut self) {
        self.save_preferences(ConsentPreferences::all());
    }

    /// Grant only the necessary category.
    pub fn accept_necessary(&mut self) {
        self.save_preferences(ConsentPreferences::default());
    }

    /// Save an explicit per-category choice from the detail view.
    pub fn save(&mut self, analytics: bool, preferences: bool, marketing: bool) {
        self.save_preferences(ConsentPreferences {
            necessary: true,
            analytics,
            preferences,
            marketing,
        });
    }

    /// Watch channel carrying `Some(prefs)` once a choice exists.
    #[must_use]
    pub fn decided(&self) -> watch::Receiver<Option<ConsentPreferences>> {
        self.decided.subscribe()
    }

    /// Wait until the user has made (or previously stored) a choice.
    pub async fn wait_decided(&self) -> ConsentPreferences {
        let mut rx = self.decided.subscribe();
        let decided = rx.wait_for(Option::is_some).await;
        decided.map_or_else(|_| ConsentPreferences::default(), |guard| {
            guard.clone().unwrap_or_default()
        })
    }

    fn save_preferences(&mut self, mut prefs: ConsentPreferences) {
        prefs.necessary = true;
        self.prefs = prefs;
        match serde_json::to_string(&self.prefs) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(CONSENT_STORAGE_KEY, &raw) {
                    warn!(error = %e, "failed to persist consent choice; continuing in memory");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize consent choice"),
        }
        self.stored_choice = true;
        self.view = ConsentView::Hidden;
        self.decided.send_replace(Some(self.prefs.clone()));
        self.notify(&ConsentEvent::Changed(self.prefs.clone()));
    }

    fn notify(&self, event: &ConsentEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }
}

fn load_preferences(storage: &dyn KeyValueStore) -> Option<ConsentPreferences> {
    let raw = match storage.get(CONSENT_STORAGE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "failed to read stored consent; prompting again");
            return None;
        }
    };
    match serde_json::from_str::<ConsentPreferences>(&raw) {
        Ok(mut prefs) => {
            prefs.necessary = true;
            Some(prefs)
        }
        Err(e) => {
            warn!(error = %e, "stored consent unreadable; prompting again");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "consent_test.rs"]
mod tests;
