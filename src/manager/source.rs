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

//! Source resolution and backend selection

use crate::download::{
    CatalogDownload, DownloadBackend, DownloadOperation, PreloadDownload, RemoteDownload,
    TransferRequest,
};
use crate::error::{BundleError, Result};
use crate::manager::state::ManagerState;
use std::path::Path;
use std::sync::Arc;

/// Scheme routing bundles to the on-device preload backend
pub const PRELOAD_SCHEME: &str = "odr://";

/// Scheme routing bundles to the embedded catalog backend
pub const CATALOG_SCHEME: &str = "res://";

/// Per-bundle override of the source location. Returns the base location
/// the bundle name is appended to, or `None` to fall through.
pub type UrlOverride = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Ensure a base location ends with `/`
pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// `file://` URL of a local directory, made absolute against the working
/// directory
pub(crate) fn directory_url(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(with_trailing_slash(&format!("file://{}", absolute.display())))
}

fn has_scheme(base: &str, scheme: &str) -> bool {
    base.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

impl ManagerState {
    /// Base location for `name`: first override that answers, else the
    /// configured source URL
    pub(crate) fn resolve_base(&self, name: &str) -> Result<String> {
        for url_override in &self.url_overrides {
            if let Some(base) = url_override(name) {
                return Ok(base);
            }
        }
        self.base_url.clone().ok_or_else(|| {
            BundleError::Config(
                "no bundle source configured; call set_source_url() or set_development_server()"
                    .to_string(),
            )
        })
    }

    pub(crate) fn resolve_url(&self, name: &str) -> Result<String> {
        Ok(format!("{}{name}", self.resolve_base(name)?))
    }

    /// Build the download for `name` on the backend its source selects
    pub(crate) fn create_download(&self, name: &str, is_manifest: bool) -> Result<DownloadOperation> {
        let base = self.resolve_base(name)?;
        let url = format!("{base}{name}");

        let backend: Box<dyn DownloadBackend> = if has_scheme(&base, PRELOAD_SCHEME) {
            let path = self.settings.resource_root.join(name);
            Box::new(PreloadDownload::new(name, url.clone(), path, self.preload.as_ref()))
        } else if has_scheme(&base, CATALOG_SCHEME) {
            let path = self.settings.resource_root.join(name);
            Box::new(CatalogDownload::new(name, url.clone(), &path))
        } else {
            let hash = if is_manifest {
                None
            } else {
                self.manifest
                    .as_ref()
                    .and_then(|m| m.hash(name))
                    .map(str::to_string)
            };
            let transfer = self.transport.begin(TransferRequest {
                bundle: name.to_string(),
                url: url.clone(),
                hash,
            });
            Box::new(RemoteDownload::new(name, url.clone(), transfer))
        };

        tracing::debug!(bundle = %name, url = %url, "download started");
        Ok(DownloadOperation::new(name, backend))
    }
}
