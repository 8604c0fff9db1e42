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

use crate::asset::Asset;
use crate::error::BundleError;
use crate::load::{log_latched, LoadAssetOperation};
use crate::manager::BundleManager;
use crate::manifest::Manifest;
use crate::operation::Operation;

/// Extracts the manifest from the platform bundle and publishes it to the
/// manager. Must finish before any other load resolves dependencies.
#[derive(Debug)]
pub struct LoadManifestOperation {
    inner: LoadAssetOperation,
    published: bool,
    error: Option<BundleError>,
}

impl LoadManifestOperation {
    pub(crate) fn new(manager: BundleManager, platform: String, asset_name: String) -> Self {
        Self {
            inner: LoadAssetOperation::new(manager, platform, asset_name, Manifest::TYPE_TAG),
            published: false,
            error: None,
        }
    }

    /// The extracted manifest, once published
    pub fn manifest(&self) -> Option<Manifest> {
        if self.published {
            self.inner.get_asset::<Manifest>()
        } else {
            None
        }
    }
}

impl Operation for LoadManifestOperation {
    fn update(&mut self) -> bool {
        if self.is_done() {
            return false;
        }

        self.inner.update();
        if self.inner.is_done() && self.inner.error().is_none() {
            match self.inner.get_asset::<Manifest>() {
                Some(manifest) => {
                    self.inner.manager().publish_manifest(manifest);
                    self.published = true;
                }
                None => {
                    let error = BundleError::Decode(format!(
                        "platform bundle '{}' holds no readable manifest '{}'",
                        self.inner.bundle_name(),
                        self.inner.asset_name()
                    ));
                    log_latched(&error, self.inner.bundle_name(), self.inner.asset_name());
                    self.error = Some(error);
                }
            }
        }
        !self.is_done()
    }

    fn is_done(&self) -> bool {
        self.inner.is_done() && (self.published || self.error().is_some())
    }

    fn error(&self) -> Option<&BundleError> {
        self.inner.error().or(self.error.as_ref())
    }
}
