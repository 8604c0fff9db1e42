mod common;

use archetype_bundles::download::LocalPreloadService;
use archetype_bundles::{
    BundleArchive, BundleError, BundleManager, ErrorKind, ManagerSettings, Manifest, Operation,
    TextAsset,
};
use common::{platform_archive, test_settings, text_bundle, PLATFORM};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Poll until done; file transfers finish on worker threads
fn wait<O: Operation>(op: &mut O) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !op.update() {
            return op.is_done();
        }
        thread::sleep(Duration::from_millis(1));
    }
    op.is_done()
}

fn write_bundle(dir: &Path, archive: BundleArchive) {
    let path = dir.join(&archive.name);
    std::fs::write(path, archive.to_bytes().unwrap()).unwrap();
}

fn manifest() -> Manifest {
    Manifest::new()
        .with_bundle("ui", ["fonts"])
        .with_bundle("fonts", Vec::<String>::new())
}

fn write_all(dir: &Path) {
    write_bundle(dir, platform_archive(&manifest()));
    write_bundle(dir, text_bundle("ui"));
    write_bundle(dir, text_bundle("fonts"));
}

#[test]
fn test_directory_source_reads_files() {
    let dir = tempfile::tempdir().unwrap();
    write_all(dir.path());

    let manager = BundleManager::with_settings(test_settings());
    manager.set_source_directory(dir.path()).unwrap();
    assert!(manager.base_url().unwrap().starts_with("file://"));

    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));
    assert!(init.error().is_none(), "{:?}", init.error());

    let mut op = manager.load_asset::<TextAsset>("ui", "readme").unwrap();
    assert!(wait(&mut op));
    assert_eq!(op.get_asset::<TextAsset>().unwrap().content, "contents of ui");
    assert!(manager.is_loaded("fonts"));
}

#[test]
fn test_missing_file_is_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), platform_archive(&manifest()));
    write_bundle(dir.path(), text_bundle("ui"));

    let manager = BundleManager::with_settings(test_settings());
    manager.set_source_directory(dir.path()).unwrap();
    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));

    let mut op = manager.load("ui").unwrap();
    assert!(wait(&mut op));
    let err = op.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::Dependency);
    assert_eq!(err.root_cause().kind(), ErrorKind::Transport);
}

#[test]
fn test_preload_pin_released_with_bundle() {
    let dir = tempfile::tempdir().unwrap();
    write_all(dir.path());

    let service = LocalPreloadService::new(dir.path());
    let settings = ManagerSettings {
        resource_root: dir.path().to_path_buf(),
        ..test_settings()
    };
    let manager =
        BundleManager::with_settings(settings).with_preload_service(Arc::new(service.clone()));
    manager.set_source_url("odr://").unwrap();

    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));
    assert!(init.error().is_none(), "{:?}", init.error());

    let mut op = manager.load("ui").unwrap();
    assert!(wait(&mut op));
    assert_eq!(service.pinned(), 3);

    manager.unload("ui", true);
    assert_eq!(service.pinned(), 1);
    manager.unload_all();
    assert_eq!(service.pinned(), 0);
}

#[test]
fn test_preload_of_unknown_tag_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), platform_archive(&manifest()));

    let service = LocalPreloadService::new(dir.path());
    let settings = ManagerSettings {
        resource_root: dir.path().to_path_buf(),
        ..test_settings()
    };
    let manager =
        BundleManager::with_settings(settings).with_preload_service(Arc::new(service.clone()));
    manager.set_source_url("odr://").unwrap();
    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));

    let mut op = manager.load("fonts").unwrap();
    assert!(wait(&mut op));
    assert_eq!(op.error().unwrap().kind(), ErrorKind::Transport);
    assert_eq!(service.pinned(), 1);
}

#[test]
fn test_catalog_source_and_url_override() {
    let catalog = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    write_bundle(catalog.path(), platform_archive(&manifest()));
    write_bundle(catalog.path(), text_bundle("fonts"));
    write_bundle(remote.path(), text_bundle("ui"));

    let settings = ManagerSettings {
        resource_root: catalog.path().to_path_buf(),
        ..test_settings()
    };
    let manager = BundleManager::with_settings(settings);
    manager.set_source_url("res://").unwrap();
    let remote_url = format!("file://{}/", remote.path().display());
    manager
        .add_url_override(move |name| (name == "ui").then(|| remote_url.clone()))
        .unwrap();

    assert!(manager.resolve_url("ui").unwrap().ends_with("/ui"));
    assert_eq!(manager.resolve_url("fonts").unwrap(), "res://fonts");

    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));
    let mut op = manager.load_asset::<TextAsset>("ui", "readme").unwrap();
    assert!(wait(&mut op));
    assert_eq!(op.get_asset::<TextAsset>().unwrap().content, "contents of ui");
}

#[test]
fn test_development_server_url_includes_platform() {
    let manager = BundleManager::with_settings(test_settings());
    manager.set_development_server().unwrap();
    assert_eq!(
        manager.base_url().unwrap(),
        format!("http://localhost:7888/{PLATFORM}/")
    );
}

#[test]
fn test_initialize_without_source_is_config_error() {
    let manager = BundleManager::with_settings(test_settings());
    let err = manager.initialize().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!manager.is_initialized());
    assert!(manager.set_source_url("https://cdn.test/").is_ok());
}

#[test]
fn test_settings_file_configures_manager() {
    let dir = tempfile::tempdir().unwrap();
    write_all(dir.path());
    let settings_path = dir.path().join("bundles.json");
    let settings = ManagerSettings {
        source_url: Some(format!("file://{}", dir.path().display())),
        variants: vec!["hd".to_string()],
        ..test_settings()
    };
    std::fs::write(&settings_path, settings.to_json().unwrap()).unwrap();

    let loaded = ManagerSettings::from_json_file(&settings_path).unwrap();
    assert_eq!(loaded, settings);

    let manager = BundleManager::with_settings(loaded);
    assert!(manager.base_url().unwrap().ends_with('/'));
    assert_eq!(manager.active_variants(), vec!["hd"]);

    let mut init = manager.initialize().unwrap().unwrap();
    assert!(wait(&mut init));
    assert!(manager.is_initialized());
}

#[test]
fn test_malformed_settings_are_rejected() {
    let err = ManagerSettings::from_json_str("{ \"variants\": 7 }").unwrap_err();
    assert!(matches!(err, BundleError::Config(_)));
}
