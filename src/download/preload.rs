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

//! On-device preload backend
//!
//! The device layer pins preloaded content until its request is disposed.
//! The request is disposed when the bundle is released, not when the
//! download finishes, so the pin lives exactly as long as the bundle.

use crate::bundle::{Bundle, LoadedBundle};
use crate::download::DownloadBackend;
use crate::error::{BundleError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Device-level preload request
pub trait PreloadRequest: Send {
    fn is_done(&self) -> bool;

    /// Device error message, if the preload failed
    fn error(&self) -> Option<String>;

    /// Release the device pin
    fn dispose(self: Box<Self>);
}

/// Device-level on-demand resource service
pub trait PreloadService: Send + Sync {
    /// Start preloading the resources tagged `tags`; `None` if the request
    /// could not be issued
    fn preload(&self, tags: &[String]) -> Option<Box<dyn PreloadRequest>>;
}

/// Downloads a bundle through a [`PreloadService`], then opens it from its
/// local path
pub struct PreloadDownload {
    bundle: String,
    url: String,
    path: PathBuf,
    request: Option<Box<dyn PreloadRequest>>,
}

impl PreloadDownload {
    pub fn new(
        bundle: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        service: &dyn PreloadService,
    ) -> Self {
        let bundle = bundle.into();
        let request = service.preload(std::slice::from_ref(&bundle));
        if request.is_none() {
            tracing::warn!(bundle = %bundle, "device preload request was not issued");
        }
        Self {
            bundle,
            url: url.into(),
            path: path.into(),
            request,
        }
    }
}

impl DownloadBackend for PreloadDownload {
    fn download_is_done(&mut self) -> bool {
        self.request.as_ref().is_none_or(|r| r.is_done())
    }

    fn finish_download(&mut self) -> Result<LoadedBundle> {
        let request = self.request.take().ok_or_else(|| BundleError::Transport {
            bundle: self.bundle.clone(),
            url: self.url.clone(),
            reason: "device preload request was not issued".to_string(),
        })?;

        if let Some(reason) = request.error() {
            request.dispose();
            return Err(BundleError::Transport {
                bundle: self.bundle.clone(),
                url: self.url.clone(),
                reason,
            });
        }

        match Bundle::open(&self.bundle, &self.path) {
            Ok(bundle) => {
                let mut loaded = LoadedBundle::new(bundle);
                loaded.on_unload(move || request.dispose());
                Ok(loaded)
            }
            Err(e) => {
                request.dispose();
                Err(e)
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Preload service backed by a local directory. Requests complete at once;
/// tags without a file under the root fail.
#[derive(Clone, Debug)]
pub struct LocalPreloadService {
    root: PathBuf,
    pinned: Arc<AtomicUsize>,
}

impl LocalPreloadService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pinned: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of requests issued and not yet disposed
    pub fn pinned(&self) -> usize {
        self.pinned.load(Ordering::SeqCst)
    }
}

struct LocalPreloadRequest {
    error: Option<String>,
    pinned: Arc<AtomicUsize>,
}

impl PreloadRequest for LocalPreloadRequest {
    fn is_done(&self) -> bool {
        true
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn dispose(self: Box<Self>) {
        self.pinned.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PreloadService for LocalPreloadService {
    fn preload(&self, tags: &[String]) -> Option<Box<dyn PreloadRequest>> {
        let missing: Vec<&str> = tags
            .iter()
            .filter(|tag| !self.root.join(tag.as_str()).is_file())
            .map(String::as_str)
            .collect();
        let error = (!missing.is_empty())
            .then(|| format!("no on-demand resources tagged {}", missing.join(", ")));
        self.pinned.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(LocalPreloadRequest {
            error,
            pinned: self.pinned.clone(),
        }))
    }
}
