// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bundle manager: the coordination core
//!
//! [`BundleManager`] is an explicitly constructed context shared by every
//! operation it hands out. It owns the bundle cache, the registry of
//! in-flight downloads (at most one per bundle name), the dependency
//! bookkeeping, variant preferences and source resolution.
//!
//! Typical use:
//!
//! ```no_run
//! use archetype_bundles::{drive, BundleManager, Operation, TextAsset};
//!
//! let manager = BundleManager::new();
//! manager.set_source_url("https://cdn.example.com/bundles/")?;
//! if let Some(mut init) = manager.initialize()? {
//!     drive(&mut init, 10_000);
//! }
//! let mut op = manager.load_asset::<TextAsset>("ui", "credits")?;
//! while !op.is_done() {
//!     op.update(); // once per frame
//! }
//! let credits = op.get_asset::<TextAsset>();
//! # Ok::<(), archetype_bundles::BundleError>(())
//! ```

pub mod source;
pub(crate) mod state;
pub mod variant;

pub use source::{UrlOverride, CATALOG_SCHEME, PRELOAD_SCHEME};
pub use state::ManagerStats;
pub use variant::resolve_variant;

use crate::asset::Asset;
use crate::bundle::{Bundle, LoadedBundle};
use crate::download::{PreloadService, Transport};
use crate::error::{BundleError, Result};
use crate::load::{LoadAssetOperation, LoadBundleOperation, LoadManifestOperation, LoadSceneOperation};
use crate::manifest::Manifest;
use crate::scene::{SceneHost, SceneMode};
use crate::settings::ManagerSettings;
use parking_lot::Mutex;
use source::{directory_url, with_trailing_slash};
use state::ManagerState;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Shared handle to the bundle cache and resolver
#[derive(Clone)]
pub struct BundleManager {
    state: Arc<Mutex<ManagerState>>,
}

fn release_all(released: Vec<LoadedBundle>) {
    for bundle in released {
        bundle.unload();
    }
}

impl BundleManager {
    /// Create a manager with default settings
    pub fn new() -> Self {
        Self::with_settings(ManagerSettings::default())
    }

    pub fn with_settings(settings: ManagerSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState::new(settings))),
        }
    }

    /// Use `transport` for remote fetches
    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        self.state.lock().transport = transport;
        self
    }

    /// Use `service` for `odr://` sources
    pub fn with_preload_service(self, service: Arc<dyn PreloadService>) -> Self {
        self.state.lock().preload = service;
        self
    }

    /// Activate scenes through `host`
    pub fn with_scene_host(self, host: Arc<dyn SceneHost>) -> Self {
        self.state.lock().scene_host = host;
        self
    }

    /// Fetch bundles from `url`
    pub fn set_source_url(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_configurable("source URL")?;
        let url = with_trailing_slash(url);
        info!(url = %url, "bundle source set");
        state.base_url = Some(url);
        Ok(())
    }

    /// Fetch bundles from a local directory
    pub fn set_source_directory(&self, path: impl AsRef<Path>) -> Result<()> {
        let url = directory_url(path.as_ref())?;
        self.set_source_url(&url)
    }

    /// Fetch bundles from the development server for this platform
    pub fn set_development_server(&self) -> Result<()> {
        let url = {
            let state = self.state.lock();
            format!(
                "{}{}/",
                with_trailing_slash(&state.settings.development_server_url),
                state.settings.platform
            )
        };
        self.set_source_url(&url)
    }

    /// Register a per-bundle source override. Overrides are consulted in
    /// registration order before the configured source URL.
    pub fn add_url_override<F>(&self, url_override: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        state.ensure_configurable("URL overrides")?;
        state.url_overrides.push(Arc::new(url_override));
        Ok(())
    }

    /// Set the active variant tags, most preferred first. Applies to loads
    /// requested afterwards.
    pub fn set_variants<I, S>(&self, variants: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        info!(?variants, "active variants set");
        self.state.lock().settings.variants = variants;
    }

    pub fn active_variants(&self) -> Vec<String> {
        self.state.lock().settings.variants.clone()
    }

    pub fn base_url(&self) -> Option<String> {
        self.state.lock().base_url.clone()
    }

    /// Full location `name` would be fetched from
    pub fn resolve_url(&self, name: &str) -> Result<String> {
        self.state.lock().resolve_url(name)
    }

    /// Start downloading the platform bundle and extracting the manifest.
    ///
    /// Returns `None` if the manager was already initialized or the
    /// manifest is still on its way. Calling it again after the platform
    /// bundle failed to download retries the download.
    pub fn initialize(&self) -> Result<Option<LoadManifestOperation>> {
        let (platform, asset) = {
            let mut state = self.state.lock();
            if !state.can_initialize() {
                return Ok(None);
            }
            state.begin_manifest_download()?;
            (
                state.settings.platform.clone(),
                state.settings.manifest_asset_name.clone(),
            )
        };
        info!(platform = %platform, "bundle manager initializing");
        Ok(Some(LoadManifestOperation::new(self.clone(), platform, asset)))
    }

    /// Whether the manifest has been published
    pub fn is_initialized(&self) -> bool {
        self.state.lock().manifest.is_some()
    }

    pub fn manifest(&self) -> Option<Arc<Manifest>> {
        self.state.lock().manifest.clone()
    }

    /// Request `name` and its dependency closure
    pub fn load(&self, name: &str) -> Result<LoadBundleOperation> {
        let target = self.state.lock().request(name)?;
        Ok(LoadBundleOperation::new(self.clone(), target))
    }

    /// Request asset `asset` of type `type_tag` from bundle `bundle`
    pub fn load_asset_async(&self, bundle: &str, asset: &str, type_tag: &str) -> Result<LoadAssetOperation> {
        let target = self.state.lock().request(bundle)?;
        Ok(LoadAssetOperation::new(self.clone(), target, asset, type_tag))
    }

    /// Typed form of [`load_asset_async`](Self::load_asset_async)
    pub fn load_asset<T: Asset>(&self, bundle: &str, asset: &str) -> Result<LoadAssetOperation> {
        self.load_asset_async(bundle, asset, T::TYPE_TAG)
    }

    /// Request scene `scene` from bundle `bundle`
    pub fn load_scene_async(&self, bundle: &str, scene: &str, mode: SceneMode) -> Result<LoadSceneOperation> {
        let target = self.state.lock().request(bundle)?;
        Ok(LoadSceneOperation::new(self.clone(), target, scene, mode))
    }

    /// Poll every in-flight download once. Returns whether any download is
    /// still in flight or held back.
    pub fn update(&self) -> bool {
        let (released, pending) = {
            let mut state = self.state.lock();
            let released = state.pump();
            (released, state.has_pending())
        };
        release_all(released);
        pending
    }

    /// Cached bundle, `Ok(None)` while it or a dependency is pending, or the
    /// terminal error of the bundle or of its dependency closure
    pub fn get_loaded_bundle(&self, name: &str) -> Result<Option<Arc<Bundle>>> {
        self.state.lock().loaded_bundle(name)
    }

    /// Drop one reference on `name`, and on its dependency closure when
    /// `also_dependencies` is set. Bundles without references are released.
    pub fn unload(&self, name: &str, also_dependencies: bool) {
        let released = self.state.lock().unload(name, also_dependencies);
        release_all(released);
    }

    /// Release every cached bundle
    pub fn unload_all(&self) {
        let released = self.state.lock().unload_all();
        info!(count = released.len(), "all bundles released");
        release_all(released);
    }

    /// Run `hook` when the cached bundle `name` is released
    pub fn on_unload<F>(&self, name: &str, hook: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.state.lock().on_unload(name, hook)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.lock().is_loaded(name)
    }

    /// Whether a download for `name` is in flight
    pub fn is_downloading(&self, name: &str) -> bool {
        self.state.lock().is_downloading(name)
    }

    /// Whether `name` is waiting for its dependencies before downloading
    pub fn is_queued(&self, name: &str) -> bool {
        self.state.lock().is_queued(name)
    }

    pub fn reference_count(&self, name: &str) -> usize {
        self.state.lock().reference_count(name)
    }

    /// Bundles holding `name` alive as a dependency
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.state.lock().dependents(name)
    }

    /// Recorded download failure of `name` itself
    pub fn downloading_error(&self, name: &str) -> Option<BundleError> {
        self.state.lock().downloading_error(name)
    }

    /// Number of downloads in flight
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending_count()
    }

    pub fn loaded_bundle_names(&self) -> Vec<String> {
        self.state.lock().loaded_names()
    }

    pub fn stats(&self) -> ManagerStats {
        self.state.lock().stats()
    }

    pub(crate) fn publish_manifest(&self, manifest: Manifest) {
        self.state.lock().publish_manifest(manifest);
    }

    pub(crate) fn scene_host(&self) -> Arc<dyn SceneHost> {
        self.state.lock().scene_host.clone()
    }
}

impl Default for BundleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BundleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BundleManager")
            .field("base_url", &state.base_url)
            .field("platform", &state.settings.platform)
            .field("initialized", &state.manifest.is_some())
            .field("loaded", &state.loaded_names())
            .field("pending", &state.pending_count())
            .finish()
    }
}
