use std::fs;

use diagscope::catalog::Catalog;
use diagscope::domain::SignalKey;
use diagscope::session::{Session, SessionConfig};
use diagscope::state::{Command, Mode, Outcome};
use diagscope::store::{ActiveSet, ActiveSetStore};
use diagscope::transport::MemoryTransport;

fn session_at(path: &std::path::Path) -> Session<MemoryTransport> {
    let mut session = Session::new(
        Catalog::standard(),
        ActiveSetStore::new(path),
        MemoryTransport::new(),
        SessionConfig::default(),
    );
    session.set_rows(10);
    session
}

#[test]
fn test_store_round_trip_keeps_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = ActiveSetStore::new(dir.path().join("active.json"));
    let catalog = Catalog::standard();

    let mut set = ActiveSet::new();
    set.insert(SignalKey::new(0x7E0, 0x01, 0x0C));
    set.insert(SignalKey::new(0x7E0, 0x22, 0xF40C));
    store.save(&set).unwrap();

    assert_eq!(store.load(&catalog), set);
}

#[test]
fn test_saved_file_is_array_of_triples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");
    let store = ActiveSetStore::new(&path);

    let mut set = ActiveSet::new();
    set.insert(SignalKey::new(2016, 1, 12));
    store.save(&set).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, serde_json::json!([[2016, 1, 12]]));
}

#[test]
fn test_zero_byte_file_activates_every_signal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");
    fs::write(&path, "").unwrap();

    let session = session_at(&path);
    assert_eq!(session.active().len(), session.catalog().len());
}

#[test]
fn test_committed_empty_selection_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");

    let mut session = session_at(&path);
    session.apply(Command::ToggleMode);
    session.apply(Command::SelectNone);
    assert_eq!(session.apply(Command::Commit), Outcome::Committed);

    assert!(session_at(&path).active().is_empty());
}

#[test]
fn test_configure_select_one_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");
    fs::write(&path, "").unwrap();

    let mut session = session_at(&path);
    assert_eq!(session.apply(Command::ToggleMode), Outcome::Changed);
    assert_eq!(session.view().mode, Mode::Configure);

    session.apply(Command::SelectNone);
    assert!(session.active().is_empty());

    // cursor starts on the first catalog entry
    session.apply(Command::ToggleSignal);
    let first = session.catalog().entries()[0].key;
    assert_eq!(session.apply(Command::Commit), Outcome::Committed);
    assert_eq!(session.view().mode, Mode::View);

    let reloaded = ActiveSetStore::new(&path).load(&Catalog::standard());
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.contains(&first));
}

#[test]
fn test_toggle_alone_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");

    let mut session = session_at(&path);
    session.apply(Command::ToggleMode);
    session.apply(Command::ToggleSignal);
    assert!(!path.exists());
}

#[test]
fn test_unknown_keys_are_dropped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("active.json");
    fs::write(&path, "[[2016, 1, 12], [1, 2, 3]]").unwrap();

    let session = session_at(&path);
    assert_eq!(session.active().len(), 1);
    assert!(session.active().contains(&SignalKey::new(0x7E0, 0x01, 0x0C)));
}
