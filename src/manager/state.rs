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

//! Bundle cache, pending-request registry and dependency bookkeeping
//!
//! All mutation happens behind the manager's mutex, so check-then-insert
//! and decrement-then-release sequences are atomic with respect to other
//! callers.

use crate::bundle::{Bundle, LoadedBundle};
use crate::download::{default_transport, DownloadOperation, LocalPreloadService, PreloadService, Transport};
use crate::error::{BundleError, Result};
use crate::manager::source::{with_trailing_slash, UrlOverride};
use crate::manager::variant::resolve_variant;
use crate::manifest::Manifest;
use crate::operation::Operation;
use crate::scene::{HeadlessSceneHost, SceneHost};
use crate::settings::ManagerSettings;
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manager statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub downloads_started: u64,
    pub downloads_failed: u64,
    pub cache_hits: u64,
    pub bundles_released: u64,
}

/// References taken on a bundle that is not cached yet
#[derive(Debug, Default)]
struct PendingReferences {
    count: usize,
    dependents: BTreeSet<String>,
}

/// Download held back until everything it requires is cached
#[derive(Debug)]
struct QueuedDownload {
    name: String,
    requires: Vec<String>,
    is_manifest: bool,
}

pub(crate) struct ManagerState {
    pub(crate) settings: ManagerSettings,
    pub(crate) base_url: Option<String>,
    pub(crate) url_overrides: Vec<UrlOverride>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) preload: Arc<dyn PreloadService>,
    pub(crate) scene_host: Arc<dyn SceneHost>,
    pub(crate) manifest: Option<Arc<Manifest>>,
    initialize_called: bool,
    loaded: AHashMap<String, LoadedBundle>,
    in_flight: AHashMap<String, DownloadOperation>,
    queued: Vec<QueuedDownload>,
    references: AHashMap<String, PendingReferences>,
    errors: AHashMap<String, BundleError>,
    /// Latest resolved closure of every requested name and of every
    /// bundle inside such a closure
    closures: AHashMap<String, Vec<String>>,
    /// One closure per reference taken by `request`, most recent last
    held: AHashMap<String, Vec<Vec<String>>>,
    stats: ManagerStats,
}

impl ManagerState {
    pub(crate) fn new(settings: ManagerSettings) -> Self {
        let base_url = settings.source_url.as_deref().map(with_trailing_slash);
        let preload = Arc::new(LocalPreloadService::new(settings.resource_root.clone()));
        Self {
            settings,
            base_url,
            url_overrides: Vec::new(),
            transport: default_transport(),
            preload,
            scene_host: Arc::new(HeadlessSceneHost::new()),
            manifest: None,
            initialize_called: false,
            loaded: AHashMap::new(),
            in_flight: AHashMap::new(),
            queued: Vec::new(),
            references: AHashMap::new(),
            errors: AHashMap::new(),
            closures: AHashMap::new(),
            held: AHashMap::new(),
            stats: ManagerStats::default(),
        }
    }

    /// Source settings are frozen once the platform bundle is requested,
    /// and thawed again if its download failed before a manifest arrived
    pub(crate) fn ensure_configurable(&self, what: &'static str) -> Result<()> {
        let frozen = self.initialize_called && !self.manifest_download_failed();
        if self.manifest.is_some() || frozen {
            Err(BundleError::AlreadyInitialized(what))
        } else {
            Ok(())
        }
    }

    /// Queue the platform bundle that carries the manifest. It has no
    /// dependencies and bypasses variant resolution.
    pub(crate) fn begin_manifest_download(&mut self) -> Result<()> {
        let platform = self.settings.platform.clone();
        self.resolve_base(&platform)?;
        self.initialize_called = true;
        // A retry replaces the reference the failed attempt left behind
        self.references.remove(&platform);
        self.register(&platform, None, Vec::new(), true);
        self.start_eligible();
        Ok(())
    }

    /// Whether `initialize()` may queue the platform bundle: never called,
    /// or the previous attempt failed before a manifest was published
    pub(crate) fn can_initialize(&self) -> bool {
        self.manifest.is_none() && (!self.initialize_called || self.manifest_download_failed())
    }

    fn manifest_download_failed(&self) -> bool {
        self.errors.contains_key(&self.settings.platform)
    }

    pub(crate) fn publish_manifest(&mut self, manifest: Manifest) {
        info!(bundles = manifest.len(), "manifest published");
        self.manifest = Some(Arc::new(manifest));
    }

    /// Take one reference on `requested` and on every bundle of its
    /// dependency closure, queueing downloads for whatever is neither cached
    /// nor in flight. Returns the concrete (variant-resolved) name.
    pub(crate) fn request(&mut self, requested: &str) -> Result<String> {
        let manifest = self.manifest.clone().ok_or(BundleError::NotInitialized)?;
        let active = self.settings.variants.clone();
        let resolve = |name: &str| resolve_variant(&manifest, name, &active);

        let target = resolve(requested)?;
        let closure = manifest.all_dependencies_with(&target, resolve)?;
        let plan = closure
            .iter()
            .map(|name| Ok((name.clone(), manifest.all_dependencies_with(name, resolve)?)))
            .collect::<Result<Vec<_>>>()?;

        // Source problems are reported before any reference is taken
        for name in closure.iter().chain(std::iter::once(&target)) {
            if !self.loaded.contains_key(name) && !self.in_flight.contains_key(name) {
                self.resolve_base(name)?;
            }
        }

        for (name, requires) in plan {
            self.closures.insert(name.clone(), requires.clone());
            self.register(&name, Some(&target), requires, false);
        }
        self.register(&target, None, closure.clone(), false);
        self.closures.insert(target.clone(), closure.clone());
        self.held.entry(target.clone()).or_default().push(closure);
        self.start_eligible();
        Ok(target)
    }

    fn register(&mut self, name: &str, dependent: Option<&str>, requires: Vec<String>, is_manifest: bool) {
        if let Some(bundle) = self.loaded.get_mut(name) {
            bundle.retain(1);
            if let Some(dependent) = dependent {
                bundle.add_dependent(dependent);
            }
            self.stats.cache_hits += 1;
            debug!(bundle = %name, references = bundle.reference_count(), "cache hit");
            return;
        }

        let references = self.references.entry(name.to_string()).or_default();
        references.count += 1;
        if let Some(dependent) = dependent {
            references.dependents.insert(dependent.to_string());
        }

        if self.in_flight.contains_key(name) || self.queued.iter().any(|q| q.name == name) {
            debug!(bundle = %name, "joining pending download");
            return;
        }

        if let Some(previous) = self.errors.remove(name) {
            info!(bundle = %name, error = %previous, "retrying failed bundle");
        }
        self.queued.push(QueuedDownload {
            name: name.to_string(),
            requires,
            is_manifest,
        });
    }

    /// Start every queued download whose requirements are all cached.
    /// Downloads waiting on a failed bundle are dropped; their references
    /// stay so a later `request` queues them again.
    fn start_eligible(&mut self) {
        let mut index = 0;
        while index < self.queued.len() {
            if let Some(failed) = self.queued[index]
                .requires
                .iter()
                .find(|dep| self.errors.contains_key(dep.as_str()))
            {
                debug!(
                    bundle = %self.queued[index].name,
                    dependency = %failed,
                    "dropping download blocked by failed dependency"
                );
                self.queued.remove(index);
                continue;
            }

            let ready = self.queued[index]
                .requires
                .iter()
                .all(|dep| self.loaded.contains_key(dep));
            if !ready {
                index += 1;
                continue;
            }

            let queued = self.queued.remove(index);
            match self.create_download(&queued.name, queued.is_manifest) {
                Ok(download) => {
                    self.stats.downloads_started += 1;
                    self.in_flight.insert(queued.name, download);
                }
                Err(e) => {
                    warn!(bundle = %queued.name, error = %e, "download could not be started");
                    self.stats.downloads_failed += 1;
                    self.errors.insert(queued.name, e);
                }
            }
        }
    }

    /// Poll in-flight downloads and settle the finished ones. Bundles that
    /// finished with no reference left are returned for release.
    pub(crate) fn pump(&mut self) -> Vec<LoadedBundle> {
        let finished: Vec<String> = self
            .in_flight
            .iter_mut()
            .filter_map(|(name, download)| (!download.update()).then(|| name.clone()))
            .collect();

        let mut released = Vec::new();
        for name in &finished {
            let Some(mut download) = self.in_flight.remove(name) else {
                continue;
            };
            let references = self.references.remove(name).unwrap_or_default();
            match download.take_result() {
                Some(Ok(mut bundle)) => {
                    bundle.retain(references.count);
                    for dependent in &references.dependents {
                        bundle.add_dependent(dependent);
                    }
                    if references.count == 0 {
                        info!(bundle = %name, "bundle released on arrival; no references left");
                        self.stats.bundles_released += 1;
                        released.push(bundle);
                    } else {
                        info!(bundle = %name, url = %download.url(), "bundle cached");
                        self.loaded.insert(name.clone(), bundle);
                    }
                }
                Some(Err(e)) => {
                    warn!(bundle = %name, url = %download.url(), error = %e, "bundle download failed");
                    self.stats.downloads_failed += 1;
                    self.errors.insert(name.clone(), e);
                    if references.count > 0 {
                        self.references.insert(name.clone(), references);
                    }
                }
                None => {}
            }
        }

        if !finished.is_empty() {
            self.start_eligible();
        }
        released
    }

    /// Cached bundle for `name`, `None` while it or a dependency is still
    /// pending, or the first failure found in its dependency closure
    pub(crate) fn loaded_bundle(&self, name: &str) -> Result<Option<Arc<Bundle>>> {
        if let Some(error) = self.errors.get(name) {
            return Err(error.clone());
        }

        let dependencies = self.closures.get(name);
        if let Some(dependencies) = dependencies {
            for dep in dependencies {
                if let Some(error) = self.errors.get(dep) {
                    return Err(BundleError::dependency(name, dep, error.clone()));
                }
            }
        }

        let Some(bundle) = self.loaded.get(name) else {
            return Ok(None);
        };
        if dependencies.is_some_and(|deps| deps.iter().any(|d| !self.loaded.contains_key(d))) {
            return Ok(None);
        }
        Ok(Some(bundle.bundle().clone()))
    }

    /// Drop one reference on `name`. With `also_dependencies`, also drop
    /// the references taken by the most recent `request` on `name`. Returns
    /// bundles whose last reference went away.
    pub(crate) fn unload(&mut self, name: &str, also_dependencies: bool) -> Vec<LoadedBundle> {
        let mut released = Vec::new();
        let target_gone = self.release_reference(name, &mut released);

        if also_dependencies {
            if let Some(closure) = self.held.get_mut(name).and_then(Vec::pop) {
                for dep in closure.iter().rev() {
                    self.release_reference(dep, &mut released);
                }
                self.forget_closure(name, &closure);
            }
        }

        if target_gone {
            for closure in self.held.remove(name).unwrap_or_default() {
                for dep in &closure {
                    self.drop_dependent(dep, name);
                }
            }
            self.closures.remove(name);
        }
        released
    }

    /// Stop listing `name` as a dependent of bundles no remaining reference
    /// on `name` needs, and make the newest remaining closure current
    fn forget_closure(&mut self, name: &str, closure: &[String]) {
        let remaining = self.held.get(name).cloned().unwrap_or_default();
        for dep in closure {
            if !remaining.iter().any(|c| c.contains(dep)) {
                self.drop_dependent(dep, name);
            }
        }
        match remaining.last() {
            Some(current) => {
                self.closures.insert(name.to_string(), current.clone());
            }
            None => {
                self.held.remove(name);
            }
        }
    }

    /// Returns `true` when no reference on `name` remains
    fn release_reference(&mut self, name: &str, released: &mut Vec<LoadedBundle>) -> bool {
        if let Some(bundle) = self.loaded.get_mut(name) {
            if !bundle.release() {
                debug!(bundle = %name, references = bundle.reference_count(), "reference dropped");
                return false;
            }
            if !self.held.contains_key(name) {
                self.closures.remove(name);
            }
            if let Some(bundle) = self.loaded.remove(name) {
                info!(bundle = %name, "bundle released");
                self.stats.bundles_released += 1;
                released.push(bundle);
            }
            return true;
        }

        if let Some(references) = self.references.get_mut(name) {
            references.count = references.count.saturating_sub(1);
            if references.count > 0 {
                return false;
            }
            self.references.remove(name);
            if !self.held.contains_key(name) {
                self.closures.remove(name);
            }
            // Held-back downloads are dropped; in-flight ones finish and
            // are released on arrival
            self.queued.retain(|q| q.name != name);
            return true;
        }

        warn!(bundle = %name, "unload requested for a bundle that is not loaded");
        true
    }

    fn drop_dependent(&mut self, dependency: &str, dependent: &str) {
        if let Some(bundle) = self.loaded.get_mut(dependency) {
            bundle.remove_dependent(dependent);
        } else if let Some(references) = self.references.get_mut(dependency) {
            references.dependents.remove(dependent);
        }
    }

    /// Release every cached bundle regardless of reference counts
    pub(crate) fn unload_all(&mut self) -> Vec<LoadedBundle> {
        self.queued.clear();
        self.references.clear();
        self.closures.clear();
        self.held.clear();
        let released: Vec<LoadedBundle> = self.loaded.drain().map(|(_, bundle)| bundle).collect();
        self.stats.bundles_released += released.len() as u64;
        released
    }

    pub(crate) fn on_unload(&mut self, name: &str, hook: impl FnOnce() + Send + 'static) -> Result<()> {
        let bundle = self
            .loaded
            .get_mut(name)
            .ok_or_else(|| BundleError::Config(format!("bundle '{name}' is not loaded")))?;
        bundle.on_unload(hook);
        Ok(())
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.in_flight.is_empty() || !self.queued.is_empty()
    }

    pub(crate) fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub(crate) fn is_downloading(&self, name: &str) -> bool {
        self.in_flight.contains_key(name)
    }

    pub(crate) fn is_queued(&self, name: &str) -> bool {
        self.queued.iter().any(|q| q.name == name)
    }

    pub(crate) fn reference_count(&self, name: &str) -> usize {
        match self.loaded.get(name) {
            Some(bundle) => bundle.reference_count(),
            None => self.references.get(name).map_or(0, |r| r.count),
        }
    }

    pub(crate) fn dependents(&self, name: &str) -> Vec<String> {
        match self.loaded.get(name) {
            Some(bundle) => bundle.dependents().map(str::to_string).collect(),
            None => self
                .references
                .get(name)
                .map(|r| r.dependents.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    pub(crate) fn downloading_error(&self, name: &str) -> Option<BundleError> {
        self.errors.get(name).cloned()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn stats(&self) -> ManagerStats {
        self.stats.clone()
    }
}
