#![allow(dead_code)]

use archetype_bundles::download::{Transfer, TransferRequest, Transport};
use archetype_bundles::{drive, BundleArchive, BundleManager, ManagerSettings, Manifest, Operation};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const PLATFORM: &str = "TestPlatform";
pub const SOURCE: &str = "https://cdn.test/bundles/";

#[derive(Default)]
struct Script {
    payloads: HashMap<String, Result<Vec<u8>, String>>,
    held: HashSet<String>,
    begun: Vec<String>,
    requests: Vec<TransferRequest>,
}

/// In-memory transport. Every fetch completes on the next poll unless its
/// bundle is held.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, archive: BundleArchive) {
        let name = archive.name.clone();
        let bytes = archive.to_bytes().unwrap();
        self.script.lock().payloads.insert(name, Ok(bytes));
    }

    pub fn serve_raw(&self, name: &str, bytes: Vec<u8>) {
        self.script.lock().payloads.insert(name.to_string(), Ok(bytes));
    }

    pub fn fail(&self, name: &str, reason: &str) {
        self.script
            .lock()
            .payloads
            .insert(name.to_string(), Err(reason.to_string()));
    }

    pub fn hold(&self, name: &str) {
        self.script.lock().held.insert(name.to_string());
    }

    pub fn release(&self, name: &str) {
        self.script.lock().held.remove(name);
    }

    /// Bundle names in the order their fetches began
    pub fn begun(&self) -> Vec<String> {
        self.script.lock().begun.clone()
    }

    pub fn begin_count(&self, name: &str) -> usize {
        self.script.lock().begun.iter().filter(|n| *n == name).count()
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.script.lock().requests.clone()
    }
}

struct ScriptedTransfer {
    bundle: String,
    script: Arc<Mutex<Script>>,
}

impl Transfer for ScriptedTransfer {
    fn is_done(&mut self) -> bool {
        !self.script.lock().held.contains(&self.bundle)
    }

    fn take_payload(&mut self) -> Result<Vec<u8>, String> {
        self.script
            .lock()
            .payloads
            .get(&self.bundle)
            .cloned()
            .unwrap_or_else(|| Err(format!("404 Not Found: {}", self.bundle)))
    }
}

impl Transport for ScriptedTransport {
    fn begin(&self, request: TransferRequest) -> Box<dyn Transfer> {
        let mut script = self.script.lock();
        script.begun.push(request.bundle.clone());
        let bundle = request.bundle.clone();
        script.requests.push(request);
        Box::new(ScriptedTransfer {
            bundle,
            script: self.script.clone(),
        })
    }
}

/// Platform bundle carrying `manifest`
pub fn platform_archive(manifest: &Manifest) -> BundleArchive {
    BundleArchive::new(PLATFORM).with_asset(
        "BundleManifest",
        "BundleManifest",
        manifest.to_json().unwrap(),
    )
}

pub fn test_settings() -> ManagerSettings {
    ManagerSettings {
        platform: PLATFORM.to_string(),
        ..ManagerSettings::default()
    }
}

/// Manager pointed at `transport`, not yet initialized
pub fn manager_for(transport: &ScriptedTransport) -> BundleManager {
    let manager =
        BundleManager::with_settings(test_settings()).with_transport(Arc::new(transport.clone()));
    manager.set_source_url(SOURCE).unwrap();
    manager
}

/// Manager with `manifest` already published
pub fn initialized(transport: &ScriptedTransport, manifest: &Manifest) -> BundleManager {
    transport.serve(platform_archive(manifest));
    let manager = manager_for(transport);
    let mut init = manager.initialize().unwrap().expect("first initialize");
    assert!(drive(&mut init, 100), "manifest load did not finish");
    assert!(init.error().is_none(), "manifest load failed: {:?}", init.error());
    manager
}

/// A bundle with one text asset named after it
pub fn text_bundle(name: &str) -> BundleArchive {
    BundleArchive::new(name).with_asset("readme", "Text", format!("contents of {name}"))
}
