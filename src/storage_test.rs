use super::*;

#[test]
fn get_missing_key_is_none() {
    let store = MemoryStore::new();
    assert_eq!(store.get("absent").unwrap(), None);
}

#[test]
fn set_then_get_round_trips() {
    let store = MemoryStore::new();
    store.set("theme-preference", "dark").unwrap();
    assert_eq!(store.get("theme-preference").unwrap().as_deref(), Some("dark"));
}

#[test]
fn set_overwrites_previous_value() {
    let store = MemoryStore::new();
    store.set("k", "first").unwrap();
    store.set("k", "second").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    assert_eq!(store.len(), 1);
}

#[test]
fn remove_deletes_and_tolerates_missing() {
    let store = MemoryStore::new();
    store.set("k", "v").unwrap();
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
    // Removing again is fine.
    store.remove("k").unwrap();
}

#[test]
fn clones_share_the_same_map() {
    let store = MemoryStore::new();
    let handle = store.clone();
    store.set("k", "v").unwrap();
    assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
}
