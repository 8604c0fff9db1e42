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

//! Archetype Bundles - streaming bundle loader
//!
//! Downloads packaged content bundles from a remote server, an on-device
//! preload service or the embedded resource catalog, resolves their
//! dependency graph from a manifest, and caches them with reference-counted
//! lifetime. All work is advanced by polling [`Operation`]s.

pub mod asset;
pub mod bundle;
pub mod download;
pub mod error;
pub mod load;
pub mod manager;
pub mod manifest;
pub mod operation;
pub mod prelude;
pub mod profiling;
pub mod scene;
pub mod settings;

pub use asset::*;
pub use bundle::*;
pub use download::{DownloadBackend, DownloadOperation};
pub use error::*;
pub use load::*;
pub use manager::BundleManager;
pub use manifest::*;
pub use operation::*;
pub use scene::*;
pub use settings::*;
