//! Tests for the instance record store.

use chrono::Utc;
use codespawn::{EngineKind, Error, RecordStore, ResolvedInstance, ResourceLimits};
use indexmap::IndexMap;
use std::path::PathBuf;
use tempfile::TempDir;

fn instance(name: &str, runtime: EngineKind) -> ResolvedInstance {
    let mut environment = IndexMap::new();
    environment.insert("TZ".to_string(), "UTC".to_string());
    environment.insert("EDITOR".to_string(), "vim".to_string());

    ResolvedInstance {
        id: "0badf00d".to_string(),
        name: name.to_string(),
        instance_name: format!("codespawn-{}-0badf00d", name),
        runtime,
        port: 31337,
        workspace_path: PathBuf::from("/srv/projects/demo"),
        password: "pw".to_string(),
        extensions: vec!["ms-python.python".to_string()],
        limits: ResourceLimits {
            cpu: "1.5".to_string(),
            memory: "2g".to_string(),
        },
        environment,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Save / Load
// =============================================================================

#[test]
fn test_record_round_trips_for_both_runtimes() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    for runtime in [EngineKind::Docker, EngineKind::Podman] {
        let original = instance(&format!("rt-{}", runtime), runtime);
        store.save(&original).unwrap();
        let loaded = store.load(&original.instance_name).unwrap();
        assert_eq!(loaded, original);
    }
}

#[test]
fn test_record_named_after_instance() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path().join("instances"));

    let path = store.save(&instance("demo", EngineKind::Docker)).unwrap();
    assert_eq!(
        path,
        temp.path()
            .join("instances")
            .join("codespawn-demo-0badf00d.json")
    );
}

#[test]
fn test_record_is_readable_json_in_field_order() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    let path = store.save(&instance("demo", EngineKind::Podman)).unwrap();
    let content = std::fs::read_to_string(path).unwrap();

    assert!(content.contains('\n'), "pretty-printed");
    let id_pos = content.find("\"id\"").unwrap();
    let created_pos = content.find("\"created_at\"").unwrap();
    assert!(id_pos < created_pos);
    assert!(content.find("\"TZ\"").unwrap() < content.find("\"EDITOR\"").unwrap());
    assert!(content.contains("\"runtime\": \"podman\""));
}

#[test]
fn test_save_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    let mut inst = instance("demo", EngineKind::Docker);
    store.save(&inst).unwrap();
    inst.port = 40000;
    store.save(&inst).unwrap();

    assert_eq!(store.load(&inst.instance_name).unwrap().port, 40000);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_load_missing_record() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    let err = store.load("codespawn-ghost-00000000").unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(_)));
}

// =============================================================================
// Delete / List
// =============================================================================

#[test]
fn test_delete_removes_record() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    let path = store.save(&instance("demo", EngineKind::Docker)).unwrap();
    store.delete(&path);
    assert!(!path.exists());

    // Second delete is a logged no-op.
    store.delete(&path);
}

#[test]
fn test_list_sorted_and_filtered() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path());

    store.save(&instance("zeta", EngineKind::Docker)).unwrap();
    store.save(&instance("alpha", EngineKind::Podman)).unwrap();
    std::fs::write(temp.path().join("notes.txt"), "ignore me").unwrap();

    assert_eq!(
        store.list().unwrap(),
        vec![
            "codespawn-alpha-0badf00d".to_string(),
            "codespawn-zeta-0badf00d".to_string()
        ]
    );
}

#[test]
fn test_list_missing_dir_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::with_path(temp.path().join("never-created"));
    assert!(store.list().unwrap().is_empty());
}
