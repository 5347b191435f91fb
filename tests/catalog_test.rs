//! Integration tests for catalog reconciliation and persistence

mod common;

use proptest::prelude::*;
use serial_test::serial;
use skybanner::catalog::{BannerEntry, Catalog, CatalogError, CatalogStore};
use skybanner::config::Config;

/// First run: no data file, every image becomes a never-used entry
#[test]
fn test_first_reconcile_discovers_images() {
    let banners = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    common::populate_dir(banners.path(), &["b.png", "a.jpg", "c.JPEG", "notes.txt"]);

    let store = CatalogStore::new(data.path().join("bannerData.json"));
    let catalog = store.reconcile(banners.path()).unwrap();

    let ids: Vec<_> = catalog.iter().map(|e| e.file_name().to_string()).collect();
    assert_eq!(ids, vec!["a.jpg", "b.png", "c.JPEG"]);
    assert!(catalog.iter().all(|e| e.last_used_at == 0));

    // Persisted immediately
    assert!(store.path().exists());
    assert_eq!(store.load().unwrap(), catalog);
}

/// History survives, removed files disappear, new files are appended
#[test]
fn test_reconcile_after_directory_changes() {
    let banners = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    common::populate_dir(banners.path(), &["a.png", "b.png"]);

    let store = CatalogStore::new(data.path().join("bannerData.json"));
    let catalog = store.reconcile(banners.path()).unwrap();
    let a = catalog.entries()[0].identity.clone();
    let b = catalog.entries()[1].identity.clone();
    store.record_usage(&catalog, &a, 1_700_000_000).unwrap();

    std::fs::remove_file(banners.path().join("b.png")).unwrap();
    common::populate_dir(banners.path(), &["c.png"]);

    let catalog = store.reconcile(banners.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get(&a).unwrap().last_used_at, 1_700_000_000);
    assert!(!catalog.contains(&b));
    assert_eq!(catalog.entries()[1].file_name(), "c.png");
    assert_eq!(catalog.entries()[1].last_used_at, 0);
}

/// A data file written by the earlier tool keeps its history
#[test]
fn test_reads_legacy_data_file() {
    let banners = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    common::populate_dir(banners.path(), &["sunset.jpg"]);
    let identity = banners.path().join("sunset.jpg").to_string_lossy().into_owned();

    let legacy = serde_json::json!([
        { "path": identity, "lastUsed": 1733000000, "found": true },
        { "path": "Banners/deleted.png", "lastUsed": 0, "found": false }
    ]);
    let data_file = data.path().join("bannerData.json");
    std::fs::write(&data_file, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let store = CatalogStore::new(&data_file);
    let catalog = store.reconcile(banners.path()).unwrap();

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get(&identity).unwrap().last_used_at, 1733000000);

    let written = std::fs::read_to_string(&data_file).unwrap();
    assert!(!written.contains("found"));
    assert!(written.contains("lastUsed"));
}

/// The default relative layout matches identities like `Banners/a.jpg`
#[test]
#[serial]
fn test_default_layout_keeps_legacy_history() {
    let workdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(workdir.path().join("Banners")).unwrap();
    common::populate_dir(&workdir.path().join("Banners"), &["a.jpg", "b.png"]);

    let legacy = serde_json::json!([
        { "path": "Banners/a.jpg", "lastUsed": 1733000000, "found": true },
        { "path": "Banners/b.png", "lastUsed": 1733100000, "found": true }
    ]);
    std::fs::write(
        workdir.path().join("bannerData.json"),
        serde_json::to_string_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(workdir.path()).unwrap();

    let config = Config::default();
    let result = CatalogStore::new(&config.rotation.data_file).reconcile(&config.rotation.banner_dir);

    std::env::set_current_dir(previous).unwrap();
    let catalog = result.unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("Banners/a.jpg").unwrap().last_used_at, 1733000000);
    assert_eq!(catalog.get("Banners/b.png").unwrap().last_used_at, 1733100000);

    let written = std::fs::read_to_string(workdir.path().join("bannerData.json")).unwrap();
    assert!(written.contains("\"Banners/a.jpg\""));
    assert!(!written.contains("./Banners"));
}

/// Unreadable inputs abort without touching the persisted file
#[test]
fn test_reconcile_failures_leave_file_untouched() {
    let data = tempfile::tempdir().unwrap();
    let data_file = data.path().join("bannerData.json");
    std::fs::write(&data_file, "{ not json").unwrap();

    let banners = tempfile::tempdir().unwrap();
    let store = CatalogStore::new(&data_file);
    assert!(matches!(
        store.reconcile(banners.path()),
        Err(CatalogError::CatalogUnreadable { .. })
    ));
    assert_eq!(std::fs::read_to_string(&data_file).unwrap(), "{ not json");

    let good = data.path().join("good.json");
    let store = CatalogStore::new(&good);
    store.save(&common::catalog_of(&[("x.png", 5)])).unwrap();
    let before = std::fs::read(&good).unwrap();

    assert!(matches!(
        store.reconcile(&data.path().join("missing-dir")),
        Err(CatalogError::DirectoryUnreadable { .. })
    ));
    assert_eq!(std::fs::read(&good).unwrap(), before);
}

/// Recording an identity that vanished fails and changes nothing
#[test]
fn test_record_usage_unknown_identity() {
    let data = tempfile::tempdir().unwrap();
    let store = CatalogStore::new(data.path().join("bannerData.json"));
    let catalog = common::catalog_of(&[("a.png", 10), ("b.png", 20)]);
    store.save(&catalog).unwrap();

    let result = store.record_usage(&catalog, "gone.png", 99);
    assert!(matches!(result, Err(CatalogError::UnknownIdentity { .. })));
    assert_eq!(store.load().unwrap(), catalog);
}

fn listing_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-e]{1,3}\\.(png|jpg)", 0..8)
        .prop_map(|set| set.into_iter().collect())
}

fn persisted_strategy() -> impl Strategy<Value = Catalog> {
    prop::collection::btree_map("[a-e]{1,3}\\.(png|jpg)", 0i64..2_000_000_000, 0..8).prop_map(
        |map| {
            Catalog::from_entries(
                map.into_iter()
                    .map(|(id, ts)| BannerEntry::with_last_used(id, ts))
                    .collect(),
            )
            .unwrap()
        },
    )
}

proptest! {
    #[test]
    fn prop_reconcile_is_idempotent(persisted in persisted_strategy(), listing in listing_strategy()) {
        let once = Catalog::reconcile(persisted, listing.clone());
        let twice = Catalog::reconcile(once.clone(), listing);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_reconcile_matches_listing(persisted in persisted_strategy(), listing in listing_strategy()) {
        let reconciled = Catalog::reconcile(persisted.clone(), listing.clone());

        prop_assert_eq!(reconciled.len(), listing.len());
        for entry in &reconciled {
            prop_assert!(listing.contains(&entry.identity));
            let expected = persisted.get(&entry.identity).map(|e| e.last_used_at).unwrap_or(0);
            prop_assert_eq!(entry.last_used_at, expected);
        }
    }

    #[test]
    fn prop_save_load_roundtrip(catalog in persisted_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("bannerData.json"));
        store.save(&catalog).unwrap();
        prop_assert_eq!(store.load().unwrap(), catalog);
    }
}
