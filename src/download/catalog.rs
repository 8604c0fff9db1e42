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

//! Embedded catalog backend: synchronous open at construction

use crate::bundle::{Bundle, LoadedBundle};
use crate::download::DownloadBackend;
use crate::error::{BundleError, Result};
use std::path::Path;

/// Opens a bundle from an embedded catalog path. Always reports done.
pub struct CatalogDownload {
    url: String,
    outcome: Option<Result<Bundle>>,
}

impl CatalogDownload {
    pub fn new(bundle: &str, url: impl Into<String>, path: &Path) -> Self {
        let outcome = Bundle::open(bundle, path);
        if let Err(e) = &outcome {
            tracing::warn!(bundle = %bundle, error = %e, "catalog open failed");
        }
        Self {
            url: url.into(),
            outcome: Some(outcome),
        }
    }
}

impl DownloadBackend for CatalogDownload {
    fn download_is_done(&mut self) -> bool {
        true
    }

    fn finish_download(&mut self) -> Result<LoadedBundle> {
        match self.outcome.take() {
            Some(outcome) => outcome.map(LoadedBundle::new),
            None => Err(BundleError::Config(format!(
                "catalog download for {} finalized twice",
                self.url
            ))),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}
