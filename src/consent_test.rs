use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::storage::{MemoryStore, StorageError};

/// Storage that always fails, simulating a disabled or full medium.
struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }
    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded)
    }
    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

fn banner_with(store: MemoryStore) -> ConsentBanner {
    ConsentBanner::new(Arc::new(store))
}

fn record_events(banner: &mut ConsentBanner) -> Rc<RefCell<Vec<ConsentEvent>>> {
    let seen: Rc<RefCell<Vec<ConsentEvent>>> = Rc::default();
    let sink = seen.clone();
    banner.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));
    seen
}

// =============================================================================
// DEFAULTS AND PROMPTING
// =============================================================================

#[test]
fn defaults_allow_only_necessary() {
    let banner = banner_with(MemoryStore::new());
    assert!(banner.is_allowed("necessary"));
    assert!(!banner.is_allowed("marketing"));
    assert!(!banner.is_allowed("analytics"));
    assert!(!banner.is_allowed("preferences"));
}

#[test]
fn unknown_category_is_never_allowed() {
    let banner = banner_with(MemoryStore::new());
    assert!(!banner.is_allowed("tracking-pixels"));
}

#[test]
fn attach_without_stored_choice_shows_summary() {
    let mut banner = banner_with(MemoryStore::new());
    assert_eq!(banner.view(), ConsentView::Hidden);
    banner.on_attach();
    assert_eq!(banner.view(), ConsentView::Summary);
}

#[test]
fn attach_with_stored_choice_never_prompts() {
    let store = MemoryStore::new();
    {
        let mut first = banner_with(store.clone());
        first.on_attach();
        first.accept_all();
    }

    let mut reloaded = banner_with(store);
    let events = record_events(&mut reloaded);
    reloaded.on_attach();

    assert_eq!(reloaded.view(), ConsentView::Hidden);
    assert_eq!(*events.borrow(), vec![ConsentEvent::Loaded(ConsentPreferences::all())]);
}

// =============================================================================
// VIEW FLOW
// =============================================================================

#[test]
fn customize_reveals_detail_without_changing_state() {
    let mut banner = banner_with(MemoryStore::new());
    banner.on_attach();
    banner.customize();
    assert_eq!(banner.view(), ConsentView::Detail);
    // No state transition happened.
    assert_eq!(*banner.preferences(), ConsentPreferences::default());
}

#[test]
fn customize_is_inert_while_hidden() {
    let mut banner = banner_with(MemoryStore::new());
    banner.customize();
    assert_eq!(banner.view(), ConsentView::Hidden);
}

// =============================================================================
// SAVE TRANSITIONS
// =============================================================================

#[test]
fn accept_all_grants_everything_and_hides() {
    let mut banner = banner_with(MemoryStore::new());
    banner.on_attach();
    let events = record_events(&mut banner);

    banner.accept_all();

    assert_eq!(banner.view(), ConsentView::Hidden);
    assert!(banner.is_allowed("marketing"));
    assert_eq!(*events.borrow(), vec![ConsentEvent::Changed(ConsentPreferences::all())]);
}

#[test]
fn save_forces_necessary_true() {
    let store = MemoryStore::new();
    let mut banner = banner_with(store.clone());
    banner.on_attach();
    banner.customize();
    banner.save(true, false, false);

    assert!(banner.is_allowed("necessary"));
    assert!(banner.is_allowed("analytics"));
    assert!(!banner.is_allowed("marketing"));

    let raw = store.get(CONSENT_STORAGE_KEY).unwrap().unwrap();
    let stored: ConsentPreferences = serde_json::from_str(&raw).unwrap();
    assert!(stored.necessary);
}

#[test]
fn save_overwrites_previous_choice_wholesale() {
    let store = MemoryStore::new();
    let mut banner = banner_with(store.clone());
    banner.accept_all();
    banner.save(false, false, false);

    let raw = store.get(CONSENT_STORAGE_KEY).unwrap().unwrap();
    let stored: ConsentPreferences = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, ConsentPreferences::default());
}

// =============================================================================
// STORED-OBJECT TOLERANCE
// =============================================================================

#[test]
fn partial_stored_object_fills_missing_categories() {
    let store = MemoryStore::new();
    store.set(CONSENT_STORAGE_KEY, r#"{"analytics":true}"#).unwrap();

    let banner = banner_with(store);
    assert!(banner.is_allowed("necessary"));
    assert!(banner.is_allowed("analytics"));
    assert!(!banner.is_allowed("marketing"));
}

#[test]
fn stored_necessary_false_is_corrected_on_load() {
    let store = MemoryStore::new();
    store
        .set(CONSENT_STORAGE_KEY, r#"{"necessary":false,"marketing":true}"#)
        .unwrap();

    let banner = banner_with(store);
    assert!(banner.is_allowed("necessary"));
    assert!(banner.is_allowed("marketing"));
}

#[test]
fn unreadable_stored_object_prompts_again() {
    let store = MemoryStore::new();
    store.set(CONSENT_STORAGE_KEY, "not json").unwrap();

    let mut banner = banner_with(store);
    banner.on_attach();
    assert_eq!(banner.view(), ConsentView::Summary);
}

#[tokio::test]
async fn storage_failure_keeps_choice_for_the_session() {
    let mut banner = ConsentBanner::new(Arc::new(FailingStore));
    banner.on_attach();
    assert_eq!(banner.view(), ConsentView::Summary);

    banner.save(true, false, true);

    // The failed persist is absorbed; the choice still applies in memory.
    assert_eq!(banner.view(), ConsentView::Hidden);
    assert!(banner.is_allowed("necessary"));
    assert!(banner.is_allowed("analytics"));
    assert!(!banner.is_allowed("preferences"));
    assert!(banner.is_allowed("marketing"));

    let expected =
        ConsentPreferences { necessary: true, analytics: true, preferences: false, marketing: true };
    assert_eq!(banner.wait_decided().await, expected);
}

// =============================================================================
// DECISION FUTURE
// =============================================================================

#[tokio::test]
async fn wait_decided_resolves_on_save() {
    let mut banner = banner_with(MemoryStore::new());
    banner.on_attach();
    assert!(banner.decided().borrow().is_none());

    banner.accept_necessary();
    assert_eq!(banner.wait_decided().await, ConsentPreferences::default());
}

#[tokio::test]
async fn wait_decided_resolves_immediately_with_stored_choice() {
    let store = MemoryStore::new();
    {
        let mut first = banner_with(store.clone());
        first.accept_all();
    }

    let reloaded = banner_with(store);
    assert_eq!(reloaded.wait_decided().await, ConsentPreferences::all());
}
