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

//! Host scene system seam

use crate::bundle::Bundle;
use crate::operation::AsyncRequest;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an activated scene combines with the scenes already active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneMode {
    /// Replace all active scenes
    #[default]
    Single,
    /// Add to the active scenes
    Additive,
}

/// Scene system of the host engine
pub trait SceneHost: Send + Sync {
    /// Begin activating `scene` from `bundle`; the returned request reports
    /// when activation has completed
    fn activate_scene(&self, bundle: &Bundle, scene: &str, mode: SceneMode) -> Box<dyn AsyncRequest>;
}

/// Scene host without a renderer. Tracks active scene names and finishes
/// each activation on the first poll after it was issued.
#[derive(Clone, Debug, Default)]
pub struct HeadlessSceneHost {
    active: Arc<Mutex<Vec<String>>>,
}

impl HeadlessSceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active scenes, in activation order
    pub fn active_scenes(&self) -> Vec<String> {
        self.active.lock().clone()
    }
}

struct DeferredActivation {
    polled: bool,
}

impl AsyncRequest for DeferredActivation {
    fn is_done(&self) -> bool {
        self.polled
    }

    fn poll(&mut self) {
        self.polled = true;
    }
}

impl SceneHost for HeadlessSceneHost {
    fn activate_scene(&self, bundle: &Bundle, scene: &str, mode: SceneMode) -> Box<dyn AsyncRequest> {
        let mut active = self.active.lock();
        if mode == SceneMode::Single {
            active.clear();
        }
        active.push(scene.to_string());
        tracing::info!(bundle = %bundle.name(), scene = %scene, ?mode, "scene activated");
        Box::new(DeferredActivation { polled: false })
    }
}
