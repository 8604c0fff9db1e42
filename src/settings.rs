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

//! Manager configuration

use crate::error::{BundleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default address of a local development bundle server
pub const DEFAULT_DEVELOPMENT_SERVER_URL: &str = "http://localhost:7888/";

/// Default name of the manifest asset inside the platform bundle
pub const DEFAULT_MANIFEST_ASSET_NAME: &str = "BundleManifest";

/// Bundle directory name for the platform this binary was built for
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "OSX",
        "ios" => "iOS",
        "android" => "Android",
        "linux" => "Linux",
        _ => "Unknown",
    }
}

/// Settings consumed by the bundle manager before `initialize()`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Name of the platform bundle that carries the manifest
    pub platform: String,
    /// Name of the manifest asset inside the platform bundle
    pub manifest_asset_name: String,
    /// Base URL bundles are fetched from
    pub source_url: Option<String>,
    /// Base URL of the development bundle server
    pub development_server_url: String,
    /// Directory backing `res://` and `odr://` bundle paths
    pub resource_root: PathBuf,
    /// Active variant tags, most preferred first
    pub variants: Vec<String>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            platform: platform_name().to_string(),
            manifest_asset_name: DEFAULT_MANIFEST_ASSET_NAME.to_string(),
            source_url: None,
            development_server_url: DEFAULT_DEVELOPMENT_SERVER_URL.to_string(),
            resource_root: PathBuf::from("."),
            variants: Vec::new(),
        }
    }
}

impl ManagerSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BundleError::Config(format!("invalid manager settings: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BundleError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BundleError::Config(format!("settings serialization failed: {e}")))
    }
}
