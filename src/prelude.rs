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

//! Convenient re-exports of commonly used types.
//!
//! ```
//! use archetype_bundles::prelude::*;
//! ```

pub use crate::asset::{Asset, BinaryAsset, JsonAsset, TextAsset};
pub use crate::bundle::{Bundle, BundleArchive, LoadedBundle};
pub use crate::error::{BundleError, ErrorKind};
pub use crate::load::{LoadAssetOperation, LoadBundleOperation, LoadManifestOperation, LoadSceneOperation};
pub use crate::manager::BundleManager;
pub use crate::manifest::Manifest;
pub use crate::operation::{drive, Operation};
pub use crate::scene::SceneMode;
pub use crate::settings::ManagerSettings;
