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

//! Bundle downloads
//!
//! A [`DownloadOperation`] fetches one named bundle through a
//! [`DownloadBackend`]. The backend is chosen once, when the manager
//! resolves the bundle's source:
//!
//! - [`RemoteDownload`]: transport fetch (`http://`, `file://`, ...)
//! - [`PreloadDownload`]: on-device preload (`odr://`)
//! - [`CatalogDownload`]: synchronous read from an embedded catalog (`res://`)

pub mod catalog;
pub mod preload;
pub mod remote;

pub use catalog::CatalogDownload;
pub use preload::{LocalPreloadService, PreloadDownload, PreloadRequest, PreloadService};
pub use remote::{
    default_transport, ChannelTransfer, FileTransport, RemoteDownload, Transfer, TransferRequest,
    Transport,
};
#[cfg(feature = "http")]
pub use remote::HttpTransport;

use crate::bundle::LoadedBundle;
use crate::error::{BundleError, Result};
use crate::operation::Operation;

/// Capability set every download backend provides
pub trait DownloadBackend: Send {
    /// Whether the underlying fetch has completed (successfully or not)
    fn download_is_done(&mut self) -> bool;

    /// Produce the loaded bundle or the failure. Called at most once,
    /// after `download_is_done` returned `true`.
    fn finish_download(&mut self) -> Result<LoadedBundle>;

    /// Source location, for diagnostics
    fn url(&self) -> &str;
}

/// Download of a single bundle
pub struct DownloadOperation {
    bundle_name: String,
    backend: Box<dyn DownloadBackend>,
    done: bool,
    result: Option<Result<LoadedBundle>>,
}

impl DownloadOperation {
    pub fn new(bundle_name: impl Into<String>, backend: Box<dyn DownloadBackend>) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            backend,
            done: false,
            result: None,
        }
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn url(&self) -> &str {
        self.backend.url()
    }

    /// The loaded bundle, once finished successfully and not yet claimed
    pub fn loaded_bundle(&self) -> Option<&LoadedBundle> {
        self.result.as_ref().and_then(|r| r.as_ref().ok())
    }

    /// Hand the outcome to the cache. `None` until done, and after the
    /// outcome has been taken once.
    pub(crate) fn take_result(&mut self) -> Option<Result<LoadedBundle>> {
        self.result.take()
    }
}

impl Operation for DownloadOperation {
    fn update(&mut self) -> bool {
        if !self.done && self.backend.download_is_done() {
            self.result = Some(self.backend.finish_download());
            self.done = true;
        }
        !self.done
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn error(&self) -> Option<&BundleError> {
        self.result.as_ref().and_then(|r| r.as_ref().err())
    }
}

impl std::fmt::Debug for DownloadOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOperation")
            .field("bundle_name", &self.bundle_name)
            .field("url", &self.backend.url())
            .field("done", &self.done)
            .finish()
    }
}
