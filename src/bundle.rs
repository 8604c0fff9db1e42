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

//! Bundle handles and the on-disk archive format
//!
//! A bundle archive is the 4-byte magic `ABDL` followed by a speedy-encoded
//! [`BundleArchive`]. [`Bundle`] is the decoded, immutable handle shared by
//! every operation that reads from it; [`LoadedBundle`] is the cache record
//! that owns the handle while it is referenced.

use crate::asset::Asset;
use crate::error::{BundleError, Result};
use crate::operation::AsyncRequest;
use ahash::AHashMap;
use smallvec::SmallVec;
use speedy::{Endianness, Readable, Writable};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Magic bytes at the start of every bundle archive
pub const BUNDLE_MAGIC: [u8; 4] = *b"ABDL";

/// Serialized asset entry
#[derive(Clone, Debug, PartialEq, Eq, Readable, Writable)]
pub struct ArchivedAsset {
    pub name: String,
    pub type_tag: String,
    pub data: Vec<u8>,
}

/// Serialized bundle contents
#[derive(Clone, Debug, Default, PartialEq, Eq, Readable, Writable)]
pub struct BundleArchive {
    pub name: String,
    pub assets: Vec<ArchivedAsset>,
    pub scenes: Vec<String>,
}

impl BundleArchive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an asset entry
    pub fn with_asset(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.assets.push(ArchivedAsset {
            name: name.into(),
            type_tag: type_tag.into(),
            data: data.into(),
        });
        self
    }

    /// Add a scene entry
    pub fn with_scene(mut self, name: impl Into<String>) -> Self {
        self.scenes.push(name.into());
        self
    }

    /// Encode archive with its magic header
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = self
            .write_to_vec_with_ctx(Endianness::LittleEndian)
            .map_err(|e| BundleError::InvalidBundle {
                bundle: self.name.clone(),
                reason: e.to_string(),
            })?;
        let mut bytes = Vec::with_capacity(BUNDLE_MAGIC.len() + body.len());
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode archive, validating the magic header
    pub fn from_bytes(bundle: &str, bytes: &[u8]) -> Result<Self> {
        let body = bytes
            .strip_prefix(&BUNDLE_MAGIC[..])
            .ok_or_else(|| BundleError::InvalidBundle {
                bundle: bundle.to_string(),
                reason: "missing bundle header".to_string(),
            })?;
        BundleArchive::read_from_buffer_with_ctx(Endianness::LittleEndian, body).map_err(|e| {
            BundleError::InvalidBundle {
                bundle: bundle.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Raw asset payload held by a bundle
#[derive(Clone, Debug)]
pub struct AssetData {
    name: String,
    type_tag: String,
    bytes: Arc<[u8]>,
}

impl AssetData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode as `T`; `None` if the tag differs or decoding fails
    pub fn decode<T: Asset>(&self) -> Option<T> {
        if self.type_tag != T::TYPE_TAG {
            return None;
        }
        match T::from_bytes(&self.bytes) {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::warn!(asset = %self.name, error = %e, "failed to decode asset");
                None
            }
        }
    }
}

/// Extraction request issued against a bundle
#[derive(Clone, Debug)]
pub struct AssetRequest {
    asset: Option<AssetData>,
}

impl AssetRequest {
    /// Extracted asset; `None` when the type did not match
    pub fn asset(&self) -> Option<&AssetData> {
        self.asset.as_ref()
    }
}

impl AsyncRequest for AssetRequest {
    fn is_done(&self) -> bool {
        true
    }
}

/// Decoded bundle handle
#[derive(Debug)]
pub struct Bundle {
    name: String,
    assets: AHashMap<String, AssetData>,
    scenes: Vec<String>,
}

impl Bundle {
    /// Build a handle from decoded archive contents
    pub fn from_archive(name: impl Into<String>, archive: BundleArchive) -> Self {
        let assets = archive
            .assets
            .into_iter()
            .map(|asset| {
                let data = AssetData {
                    name: asset.name.clone(),
                    type_tag: asset.type_tag,
                    bytes: Arc::from(asset.data),
                };
                (asset.name, data)
            })
            .collect();
        Self {
            name: name.into(),
            assets,
            scenes: archive.scenes,
        }
    }

    /// Decode a fetched payload
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let archive = BundleArchive::from_bytes(name, bytes)?;
        Ok(Self::from_archive(name, archive))
    }

    /// Open a bundle file synchronously
    pub fn open(name: &str, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|_| BundleError::OpenFailed {
            bundle: name.to_string(),
            path: path.display().to_string(),
        })?;
        Self::from_bytes(name, &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn scene_names(&self) -> &[String] {
        &self.scenes
    }

    pub fn contains_asset(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn contains_scene(&self, name: &str) -> bool {
        self.scenes.iter().any(|s| s == name)
    }

    /// Issue an extraction request for asset `name` of type `type_tag`
    pub fn load_asset_async(&self, name: &str, type_tag: &str) -> Result<AssetRequest> {
        let asset = self
            .assets
            .get(name)
            .ok_or_else(|| BundleError::AssetNotFound {
                bundle: self.name.clone(),
                asset: name.to_string(),
            })?;
        let asset = (asset.type_tag == type_tag).then(|| asset.clone());
        Ok(AssetRequest { asset })
    }
}

/// Callback fired when a cached bundle is released
pub type UnloadHook = Box<dyn FnOnce() + Send>;

/// Cache record for a downloaded bundle
pub struct LoadedBundle {
    bundle: Arc<Bundle>,
    reference_count: usize,
    dependents: BTreeSet<String>,
    unload_hooks: SmallVec<[UnloadHook; 1]>,
}

impl LoadedBundle {
    pub fn new(bundle: Bundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
            reference_count: 0,
            dependents: BTreeSet::new(),
            unload_hooks: SmallVec::new(),
        }
    }

    pub fn bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }

    pub fn name(&self) -> &str {
        self.bundle.name()
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    /// Bundles currently holding this one alive as a dependency
    pub fn dependents(&self) -> impl Iterator<Item = &str> {
        self.dependents.iter().map(String::as_str)
    }

    /// Register a callback to run when the bundle is released
    pub fn on_unload(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.unload_hooks.push(Box::new(hook));
    }

    pub(crate) fn retain(&mut self, count: usize) {
        self.reference_count += count;
    }

    /// Drop one reference; returns `true` when none remain
    pub(crate) fn release(&mut self) -> bool {
        self.reference_count = self.reference_count.saturating_sub(1);
        self.reference_count == 0
    }

    pub(crate) fn add_dependent(&mut self, dependent: &str) {
        self.dependents.insert(dependent.to_string());
    }

    pub(crate) fn remove_dependent(&mut self, dependent: &str) {
        self.dependents.remove(dependent);
    }

    /// Release the handle, firing unload hooks in registration order
    pub fn unload(self) {
        for hook in self.unload_hooks {
            hook();
        }
    }
}

impl fmt::Debug for LoadedBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedBundle")
            .field("name", &self.bundle.name())
            .field("reference_count", &self.reference_count)
            .field("dependents", &self.dependents)
            .field("unload_hooks", &self.unload_hooks.len())
            .finish()
    }
}
