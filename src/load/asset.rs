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
use crate::bundle::{AssetData, AssetRequest};
use crate::error::BundleError;
use crate::load::log_latched;
use crate::manager::BundleManager;
use crate::operation::{AsyncRequest, Operation};

/// Extracts one typed asset from a bundle
#[derive(Debug)]
pub struct LoadAssetOperation {
    manager: BundleManager,
    bundle_name: String,
    asset_name: String,
    type_tag: String,
    request: Option<AssetRequest>,
    error: Option<BundleError>,
}

impl LoadAssetOperation {
    pub(crate) fn new(
        manager: BundleManager,
        bundle_name: impl Into<String>,
        asset_name: impl Into<String>,
        type_tag: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            bundle_name: bundle_name.into(),
            asset_name: asset_name.into(),
            type_tag: type_tag.into(),
            request: None,
            error: None,
        }
    }

    /// Concrete bundle name after variant resolution
    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    pub(crate) fn manager(&self) -> &BundleManager {
        &self.manager
    }

    /// Raw extracted asset, once the extraction has completed
    pub fn asset_data(&self) -> Option<&AssetData> {
        self.request
            .as_ref()
            .filter(|r| r.is_done())
            .and_then(|r| r.asset())
    }

    /// Decoded asset. `None` until the extraction completes, and when the
    /// bundle holds no asset of that name and type.
    pub fn get_asset<T: Asset>(&self) -> Option<T> {
        self.asset_data().and_then(|data| data.decode::<T>())
    }

    fn latch(&mut self, error: BundleError) {
        log_latched(&error, &self.bundle_name, &self.asset_name);
        self.error = Some(error);
    }
}

impl Operation for LoadAssetOperation {
    fn update(&mut self) -> bool {
        if self.request.is_some() || self.error.is_some() {
            return !self.is_done();
        }

        self.manager.update();
        match self.manager.get_loaded_bundle(&self.bundle_name) {
            Ok(Some(bundle)) => match bundle.load_asset_async(&self.asset_name, &self.type_tag) {
                Ok(request) => self.request = Some(request),
                Err(e) => self.latch(e),
            },
            Ok(None) => {}
            Err(e) => self.latch(e),
        }
        !self.is_done()
    }

    fn is_done(&self) -> bool {
        if self.request.is_none() && self.error.is_some() {
            return true;
        }
        self.request.as_ref().is_some_and(|r| r.is_done())
    }

    fn error(&self) -> Option<&BundleError> {
        self.error.as_ref()
    }
}
