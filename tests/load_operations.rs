mod common;

use archetype_bundles::{
    drive, BinaryAsset, BundleArchive, BundleError, ErrorKind, HeadlessSceneHost, JsonAsset,
    Manifest, Operation, SceneMode, TextAsset,
};
use common::{initialized, manager_for, platform_archive, ScriptedTransport};
use std::sync::Arc;

fn level_manifest() -> Manifest {
    Manifest::new()
        .with_bundle("sceneBundle", ["textureBundle"])
        .with_bundle("textureBundle", Vec::<String>::new())
}

fn serve_levels(transport: &ScriptedTransport) {
    transport.serve(
        BundleArchive::new("sceneBundle")
            .with_scene("Arena")
            .with_scene("Lobby")
            .with_asset("config", "Json", r#"{"players": 4}"#),
    );
    transport.serve(
        BundleArchive::new("textureBundle")
            .with_asset("crate.png", "Binary", vec![0x89, b'P', b'N', b'G'])
            .with_asset("credits", "Text", "made by the tools team"),
    );
}

#[test]
fn test_asset_load_extracts_typed_asset() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager.load_asset::<TextAsset>("textureBundle", "credits").unwrap();
    assert!(op.get_asset::<TextAsset>().is_none());
    assert!(drive(&mut op, 100));
    assert!(op.error().is_none());
    assert_eq!(op.get_asset::<TextAsset>().unwrap().content, "made by the tools team");

    let mut json = manager.load_asset::<JsonAsset>("sceneBundle", "config").unwrap();
    assert!(drive(&mut json, 100));
    assert_eq!(json.get_asset::<JsonAsset>().unwrap().value["players"], 4);
}

#[test]
fn test_finished_operation_stays_finished() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager.load_asset::<BinaryAsset>("textureBundle", "crate.png").unwrap();
    assert!(drive(&mut op, 100));
    let first = op.get_asset::<BinaryAsset>().unwrap();

    for _ in 0..10 {
        assert!(!op.update());
        assert!(op.is_done());
    }
    assert_eq!(op.get_asset::<BinaryAsset>().unwrap().data, first.data);
    assert_eq!(transport.begin_count("textureBundle"), 1);
}

#[test]
fn test_two_callers_share_one_download() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());
    transport.hold("textureBundle");

    let mut first = manager.load_asset::<TextAsset>("textureBundle", "credits").unwrap();
    let mut second = manager.load_asset::<BinaryAsset>("textureBundle", "crate.png").unwrap();
    first.update();
    second.update();
    assert!(!first.is_done() && !second.is_done());

    transport.release("textureBundle");
    assert!(drive(&mut first, 100));
    assert!(drive(&mut second, 100));
    assert!(first.get_asset::<TextAsset>().is_some());
    assert!(second.get_asset::<BinaryAsset>().is_some());
    assert_eq!(transport.begin_count("textureBundle"), 1);
    assert_eq!(manager.reference_count("textureBundle"), 2);
}

#[test]
fn test_missing_asset_is_distinct_from_download_error() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager.load_asset::<TextAsset>("textureBundle", "missing").unwrap();
    assert!(drive(&mut op, 100));
    assert!(matches!(op.error(), Some(BundleError::AssetNotFound { .. })));
    assert_eq!(op.error().unwrap().kind(), ErrorKind::NotFound);
    assert!(manager.is_loaded("textureBundle"));
    assert!(manager.downloading_error("textureBundle").is_none());
}

#[test]
fn test_type_mismatch_yields_no_asset() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager.load_asset::<JsonAsset>("textureBundle", "credits").unwrap();
    assert!(drive(&mut op, 100));
    assert!(op.error().is_none());
    assert!(op.get_asset::<JsonAsset>().is_none());
}

#[test]
fn test_scene_activates_through_host() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let host = HeadlessSceneHost::new();
    transport.serve(platform_archive(&level_manifest()));
    let manager = manager_for(&transport).with_scene_host(Arc::new(host.clone()));
    let mut init = manager.initialize().unwrap().unwrap();
    assert!(drive(&mut init, 100));

    let mut arena = manager
        .load_scene_async("sceneBundle", "Arena", SceneMode::Single)
        .unwrap();
    assert!(drive(&mut arena, 100));
    assert!(arena.error().is_none());

    let mut lobby = manager
        .load_scene_async("sceneBundle", "Lobby", SceneMode::Additive)
        .unwrap();
    assert!(drive(&mut lobby, 100));
    assert_eq!(host.active_scenes(), vec!["Arena", "Lobby"]);
}

#[test]
fn test_scene_waits_for_host_completion() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager
        .load_scene_async("sceneBundle", "Arena", SceneMode::Single)
        .unwrap();
    let mut issuing_poll_wants_more = false;
    for _ in 0..100 {
        let more = op.update();
        if op.is_activating() {
            issuing_poll_wants_more = more;
            break;
        }
    }
    assert!(issuing_poll_wants_more, "activation finished on the poll that issued it");
    for _ in 0..5 {
        assert!(!op.is_done(), "querying completion must not advance the activation");
    }
    assert!(!op.update());
    assert!(op.is_done());
    assert!(drive(&mut op, 10));
    assert!(op.error().is_none());
}

#[test]
fn test_missing_scene_is_not_found() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    let manager = initialized(&transport, &level_manifest());

    let mut op = manager
        .load_scene_async("sceneBundle", "Credits", SceneMode::Single)
        .unwrap();
    assert!(drive(&mut op, 100));
    match op.error() {
        Some(BundleError::SceneNotFound { bundle, scene }) => {
            assert_eq!(bundle, "sceneBundle");
            assert_eq!(scene, "Credits");
        }
        other => panic!("expected SceneNotFound, got {other:?}"),
    }
}

#[test]
fn test_scene_with_failed_texture_never_downloads_scene_bundle() {
    let transport = ScriptedTransport::new();
    serve_levels(&transport);
    transport.fail("textureBundle", "injected failure");
    let host = HeadlessSceneHost::new();
    transport.serve(platform_archive(&level_manifest()));
    let manager = manager_for(&transport).with_scene_host(Arc::new(host.clone()));
    let mut init = manager.initialize().unwrap().unwrap();
    assert!(drive(&mut init, 100));

    let mut op = manager
        .load_scene_async("sceneBundle", "Arena", SceneMode::Single)
        .unwrap();
    assert!(drive(&mut op, 100));

    let err = op.error().expect("scene load must fail");
    assert_eq!(err.kind(), ErrorKind::Dependency);
    assert!(!op.is_activating());
    assert_eq!(transport.begin_count("sceneBundle"), 0);
    assert!(host.active_scenes().is_empty());
}

#[test]
fn test_variant_preference_selects_sibling() {
    let transport = ScriptedTransport::new();
    for name in ["art_hd", "art_sd"] {
        transport.serve(BundleArchive::new(name).with_asset("quality", "Text", name));
    }
    transport.serve(BundleArchive::new("level").with_scene("Arena"));
    let manifest = Manifest::new()
        .with_variant("art_hd", "art", "hd", Vec::<String>::new())
        .with_variant("art_sd", "art", "sd", Vec::<String>::new())
        .with_bundle("level", ["art"]);
    let manager = initialized(&transport, &manifest);

    manager.set_variants(["sd", "hd"]);
    let mut op = manager.load_asset::<TextAsset>("art", "quality").unwrap();
    assert_eq!(op.bundle_name(), "art_sd");
    assert!(drive(&mut op, 100));
    assert_eq!(op.get_asset::<TextAsset>().unwrap().content, "art_sd");

    manager.set_variants(["hd"]);
    let mut level = manager.load("level").unwrap();
    assert!(drive(&mut level, 100));
    assert_eq!(transport.begin_count("art_hd"), 1);
    assert_eq!(manager.dependents("art_hd"), vec!["level"]);
}

#[test]
fn test_variant_without_preference_is_ambiguous() {
    let transport = ScriptedTransport::new();
    let manifest = Manifest::new()
        .with_variant("art_hd", "art", "hd", Vec::<String>::new())
        .with_variant("art_sd", "art", "sd", Vec::<String>::new());
    let manager = initialized(&transport, &manifest);

    match manager.load("art") {
        Err(BundleError::AmbiguousVariant { base, candidates, .. }) => {
            assert_eq!(base, "art");
            assert_eq!(candidates, vec!["art_hd", "art_sd"]);
        }
        other => panic!("expected AmbiguousVariant, got {other:?}"),
    }
    assert_eq!(manager.load("art_sd").unwrap().bundle_name(), "art_sd");
}
