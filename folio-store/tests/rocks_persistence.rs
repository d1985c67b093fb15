//! RocksDB persistence integration tests.
//!
//! Verifies:
//! - Documents, history and the recycle bin survive a reopen
//! - The resolver opens the durable backend from a configured path
//! - A locked database falls back instead of failing resolution

use folio_core::{DocumentKey, Version, VersionPolicy};
use folio_store::{
    BackendKind, DocumentStore, RecycleBinStore, RocksConfig, RocksStore, StoreResolver,
    StoreRole, StoreSettings, VersioningStore, Wiki,
};

use std::collections::HashMap;
use tempfile::tempdir;

fn durable_settings(path: &std::path::Path) -> StoreSettings {
    StoreSettings {
        main_hint: "rocksdb".into(),
        rocksdb_path: Some(path.to_path_buf()),
        ..StoreSettings::default()
    }
}

#[test]
fn test_wiki_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db");
    let key = DocumentKey::new("Main", "Durable");

    let entry = {
        let wiki = Wiki::from_resolver(&StoreResolver::new(durable_settings(&path))).unwrap();
        assert_eq!(wiki.stores().kind(StoreRole::Main), Some(BackendKind::RocksDb));

        let mut doc = wiki.load(&key).unwrap();
        doc.content = "one".into();
        wiki.save(&mut doc, "").unwrap();
        doc.content = "two".into();
        wiki.save(&mut doc, "").unwrap();

        let mut other = wiki.load(&DocumentKey::new("Main", "Trash")).unwrap();
        other.content = "bin".into();
        wiki.save(&mut other, "").unwrap();
        wiki.delete(&other, "alice").unwrap().unwrap()
    };

    let store = RocksStore::open(RocksConfig::for_testing(&path), VersionPolicy::default()).unwrap();
    let doc = store.load(&key).unwrap();
    assert_eq!(doc.content, "two");
    assert_eq!(doc.version, Version::new(1, 2));
    assert_eq!(store.archive(&key).unwrap().len(), 2);
    assert_eq!(store.restore(entry).unwrap().content, "bin");
    assert_eq!(store.list_documents().unwrap(), vec![key]);
}

#[test]
fn test_properties_drive_resolution() {
    let dir = tempdir().unwrap();
    let props: HashMap<String, String> = [
        ("store.main.hint", "rocksdb".to_string()),
        ("store.rocksdb.path", dir.path().join("db").display().to_string()),
        ("store.versioning.hint", "memory".to_string()),
        ("store.attachment.versioning", "0".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let settings = StoreSettings::from_properties(&props).unwrap();
    let stores = StoreResolver::new(settings).resolve().unwrap();
    assert_eq!(stores.kind(StoreRole::Main), Some(BackendKind::RocksDb));
    assert_eq!(stores.kind(StoreRole::Versioning), Some(BackendKind::Memory));
    assert_eq!(stores.kind(StoreRole::RecycleBin), Some(BackendKind::RocksDb));
    assert_eq!(stores.kind(StoreRole::AttachmentVersioning), Some(BackendKind::Void));
}

#[test]
fn test_locked_database_falls_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db");
    let _holder = RocksStore::open(RocksConfig::for_testing(&path), VersionPolicy::default()).unwrap();

    let settings = StoreSettings {
        versioning_hint: Some("rocksdb".into()),
        main_hint: "memory".into(),
        rocksdb_path: Some(path),
        ..StoreSettings::default()
    };
    let stores = StoreResolver::new(settings).resolve().unwrap();
    assert_eq!(stores.kind(StoreRole::Versioning), Some(BackendKind::Memory));
}
