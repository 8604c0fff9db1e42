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

use crate::bundle::Bundle;
use crate::error::BundleError;
use crate::load::log_latched;
use crate::manager::BundleManager;
use crate::operation::Operation;
use std::sync::Arc;

/// Waits for a bundle and its dependency closure to be cached
#[derive(Debug)]
pub struct LoadBundleOperation {
    manager: BundleManager,
    bundle_name: String,
    bundle: Option<Arc<Bundle>>,
    error: Option<BundleError>,
}

impl LoadBundleOperation {
    pub(crate) fn new(manager: BundleManager, bundle_name: impl Into<String>) -> Self {
        Self {
            manager,
            bundle_name: bundle_name.into(),
            bundle: None,
            error: None,
        }
    }

    /// Concrete bundle name after variant resolution
    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    /// The cached bundle, once done
    pub fn bundle(&self) -> Option<&Arc<Bundle>> {
        self.bundle.as_ref()
    }
}

impl Operation for LoadBundleOperation {
    fn update(&mut self) -> bool {
        if self.is_done() {
            return false;
        }

        self.manager.update();
        match self.manager.get_loaded_bundle(&self.bundle_name) {
            Ok(bundle) => self.bundle = bundle,
            Err(e) => {
                log_latched(&e, &self.bundle_name, &self.bundle_name);
                self.error = Some(e);
            }
        }
        !self.is_done()
    }

    fn is_done(&self) -> bool {
        self.bundle.is_some() || self.error.is_some()
    }

    fn error(&self) -> Option<&BundleError> {
        self.error.as_ref()
    }
}
