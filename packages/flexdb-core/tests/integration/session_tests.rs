//! Session (connection manager) tests.

use flexdb_core::{Session, StoreConfig};

fn test_config() -> (tempfile::TempDir, StoreConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        reset_delay_ms: 10,
        ..Default::default()
    };
    (dir, config)
}

#[test]
fn test_open_creates_file_and_tracks_name() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config.clone());

    assert!(!session.is_open());
    session.open("shop").unwrap();
    assert_eq!(session.active_name(), Some("shop"));
    assert!(config.database_path("shop").exists());
    assert!(session.ping().unwrap());
}

#[test]
fn test_open_replaces_previous_handle() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config);
    session.open("first").unwrap();
    session.open("second").unwrap();
    assert_eq!(session.active_name(), Some("second"));
}

#[test]
fn test_close_returns_to_initial_state() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config);
    session.open("shop").unwrap();
    session.close();
    assert!(!session.is_open());
    assert!(!session.ping().unwrap());
}

#[test]
fn test_reset_reopens_active_database() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config);
    session.open("shop").unwrap();
    session.reset().unwrap();
    assert_eq!(session.active_name(), Some("shop"));
    assert!(session.ping().unwrap());
}

#[test]
fn test_reset_without_open_database_is_a_noop() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config);
    session.reset().unwrap();
    assert!(!session.is_open());
}

#[test]
fn test_rename_active_only_changes_tracked_name() {
    let (_dir, config) = test_config();
    let mut session = Session::new(config);
    session.open("old").unwrap();
    session.rename_active("new");
    assert_eq!(session.active_name(), Some("new"));
    assert!(session.ping().unwrap());
}
