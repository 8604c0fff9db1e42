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

//! Load operations: extract content from cached bundles
//!
//! Each operation waits until the manager reports its bundle (and the
//! bundle's dependency closure) cached, then issues one extraction or
//! activation request and waits for it. A failure anywhere in the closure
//! is latched and ends the operation.

mod asset;
mod bundle;
mod manifest;
mod scene;

pub use asset::LoadAssetOperation;
pub use bundle::LoadBundleOperation;
pub use manifest::LoadManifestOperation;
pub use scene::LoadSceneOperation;

use crate::error::{BundleError, ErrorKind};

/// Log a latched error once, telling dependency failures apart from
/// missing content
fn log_latched(error: &BundleError, bundle: &str, item: &str) {
    match error.kind() {
        ErrorKind::Dependency => tracing::error!(
            bundle = %bundle,
            item = %item,
            cause = %error.root_cause(),
            "{error}"
        ),
        ErrorKind::NotFound => tracing::error!(bundle = %bundle, item = %item, "content missing: {error}"),
        _ => tracing::error!(bundle = %bundle, item = %item, "download failed: {error}"),
    }
}
