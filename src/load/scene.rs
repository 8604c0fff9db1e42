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

use crate::error::BundleError;
use crate::load::log_latched;
use crate::manager::BundleManager;
use crate::operation::{AsyncRequest, Operation};
use crate::scene::SceneMode;
use std::fmt;

/// Activates a scene from a bundle through the host scene system
pub struct LoadSceneOperation {
    manager: BundleManager,
    bundle_name: String,
    scene_name: String,
    mode: SceneMode,
    request: Option<Box<dyn AsyncRequest>>,
    error: Option<BundleError>,
}

impl LoadSceneOperation {
    pub(crate) fn new(
        manager: BundleManager,
        bundle_name: impl Into<String>,
        scene_name: impl Into<String>,
        mode: SceneMode,
    ) -> Self {
        Self {
            manager,
            bundle_name: bundle_name.into(),
            scene_name: scene_name.into(),
            mode,
            request: None,
            error: None,
        }
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    /// Whether activation has been handed to the scene host
    pub fn is_activating(&self) -> bool {
        self.request.is_some()
    }

    fn latch(&mut self, error: BundleError) {
        log_latched(&error, &self.bundle_name, &self.scene_name);
        self.error = Some(error);
    }
}

impl Operation for LoadSceneOperation {
    fn update(&mut self) -> bool {
        if let Some(request) = self.request.as_mut() {
            request.poll();
            return !request.is_done();
        }
        if self.error.is_some() {
            return false;
        }

        self.manager.update();
        match self.manager.get_loaded_bundle(&self.bundle_name) {
            Ok(Some(bundle)) if bundle.contains_scene(&self.scene_name) => {
                let host = self.manager.scene_host();
                self.request = Some(host.activate_scene(&bundle, &self.scene_name, self.mode));
            }
            Ok(Some(_)) => self.latch(BundleError::SceneNotFound {
                bundle: self.bundle_name.clone(),
                scene: self.scene_name.clone(),
            }),
            Ok(None) => {}
            Err(e) => self.latch(e),
        }
        !self.is_done()
    }

    fn is_done(&self) -> bool {
        match &self.request {
            Some(request) => request.is_done(),
            None => self.error.is_some(),
        }
    }

    fn error(&self) -> Option<&BundleError> {
        self.error.as_ref()
    }
}

impl fmt::Debug for LoadSceneOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSceneOperation")
            .field("bundle_name", &self.bundle_name)
            .field("scene_name", &self.scene_name)
            .field("mode", &self.mode)
            .field("activating", &self.request.is_some())
            .field("error", &self.error)
            .finish()
    }
}
