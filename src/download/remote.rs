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

//! Remote transfer backend and transports

use crate::bundle::{Bundle, LoadedBundle};
use crate::download::DownloadBackend;
use crate::error::{BundleError, Result};
use crossbeam::channel::{self, Receiver, TryRecvError};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Parameters of a single fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub bundle: String,
    pub url: String,
    /// Content hash from the manifest; `None` for the manifest bundle itself
    pub hash: Option<String>,
}

/// In-flight fetch owned by a [`RemoteDownload`]
pub trait Transfer: Send {
    /// Whether the fetch has completed
    fn is_done(&mut self) -> bool;

    /// Fetched payload, or the transport's error message
    fn take_payload(&mut self) -> std::result::Result<Vec<u8>, String>;
}

/// Starts fetches. Implementations perform I/O off the polling thread.
pub trait Transport: Send + Sync {
    fn begin(&self, request: TransferRequest) -> Box<dyn Transfer>;
}

/// Downloads a bundle through a [`Transfer`]
pub struct RemoteDownload {
    bundle: String,
    url: String,
    transfer: Option<Box<dyn Transfer>>,
}

impl RemoteDownload {
    pub fn new(bundle: impl Into<String>, url: impl Into<String>, transfer: Box<dyn Transfer>) -> Self {
        Self {
            bundle: bundle.into(),
            url: url.into(),
            transfer: Some(transfer),
        }
    }
}

impl DownloadBackend for RemoteDownload {
    fn download_is_done(&mut self) -> bool {
        self.transfer.as_mut().is_none_or(|t| t.is_done())
    }

    fn finish_download(&mut self) -> Result<LoadedBundle> {
        // The transfer is released here whatever the outcome
        let mut transfer = self.transfer.take().ok_or_else(|| BundleError::Transport {
            bundle: self.bundle.clone(),
            url: self.url.clone(),
            reason: "transfer already released".to_string(),
        })?;

        let payload = transfer
            .take_payload()
            .map_err(|reason| BundleError::Transport {
                bundle: self.bundle.clone(),
                url: self.url.clone(),
                reason,
            })?;

        let bundle = Bundle::from_bytes(&self.bundle, &payload)?;
        Ok(LoadedBundle::new(bundle))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Transfer completed by a worker thread over a channel
pub struct ChannelTransfer {
    receiver: Option<Receiver<std::result::Result<Vec<u8>, String>>>,
    outcome: Option<std::result::Result<Vec<u8>, String>>,
}

impl ChannelTransfer {
    /// Run `fetch` on a worker thread
    pub fn spawn<F>(fetch: F) -> Self
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, String> + Send + 'static,
    {
        let (sender, receiver) = channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("bundle-transfer".to_string())
            .spawn(move || {
                // Receiver may be gone if the download was abandoned
                let _ = sender.send(fetch());
            });
        match spawned {
            Ok(_) => Self {
                receiver: Some(receiver),
                outcome: None,
            },
            Err(e) => Self::failed(format!("failed to spawn transfer worker: {e}")),
        }
    }

    /// Transfer that is already complete
    pub fn completed(payload: Vec<u8>) -> Self {
        Self {
            receiver: None,
            outcome: Some(Ok(payload)),
        }
    }

    /// Transfer that already failed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            receiver: None,
            outcome: Some(Err(reason.into())),
        }
    }
}

impl Transfer for ChannelTransfer {
    fn is_done(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        let Some(receiver) = &self.receiver else {
            return true;
        };
        match receiver.try_recv() {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.receiver = None;
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.outcome = Some(Err("transfer worker exited without a result".to_string()));
                self.receiver = None;
                true
            }
        }
    }

    fn take_payload(&mut self) -> std::result::Result<Vec<u8>, String> {
        self.outcome
            .take()
            .unwrap_or_else(|| Err("transfer has not completed".to_string()))
    }
}

/// Serves `file://` URLs and plain paths from the local filesystem
#[derive(Clone, Debug, Default)]
pub struct FileTransport;

impl FileTransport {
    fn local_path(url: &str) -> Option<PathBuf> {
        if let Some(path) = url.strip_prefix("file://") {
            return Some(PathBuf::from(path));
        }
        if url.contains("://") {
            return None;
        }
        Some(PathBuf::from(url))
    }
}

impl Transport for FileTransport {
    fn begin(&self, request: TransferRequest) -> Box<dyn Transfer> {
        let Some(path) = Self::local_path(&request.url) else {
            return Box::new(ChannelTransfer::failed(format!(
                "unsupported URL scheme: {}",
                request.url
            )));
        };
        tracing::debug!(bundle = %request.bundle, path = %path.display(), "reading bundle file");
        Box::new(ChannelTransfer::spawn(move || {
            std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))
        }))
    }
}

/// Fetches `http://` and `https://` URLs with a blocking client on worker
/// threads; everything else is delegated to [`FileTransport`]
#[cfg(feature = "http")]
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    files: FileTransport,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            files: FileTransport,
        }
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn begin(&self, request: TransferRequest) -> Box<dyn Transfer> {
        if !(request.url.starts_with("http://") || request.url.starts_with("https://")) {
            return self.files.begin(request);
        }
        tracing::debug!(bundle = %request.bundle, url = %request.url, "requesting bundle");
        let client = self.client.clone();
        Box::new(ChannelTransfer::spawn(move || {
            let response = client
                .get(&request.url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| e.to_string())
        }))
    }
}

/// Transport used when none is configured
pub fn default_transport() -> Arc<dyn Transport> {
    #[cfg(feature = "http")]
    {
        Arc::new(HttpTransport::default())
    }
    #[cfg(not(feature = "http"))]
    {
        Arc::new(FileTransport)
    }
}
