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

//! Error types

use thiserror::Error;

/// Broad classification of a [`BundleError`].
///
/// Download-time failures (`Transport`, `Validation`, `Dependency`) and
/// load-time failures (`NotFound`) travel through the same error channel;
/// the kind tells them apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend failed to fetch the bundle.
    Transport,
    /// The fetched payload is not a well-formed bundle.
    Validation,
    /// A bundle in the dependency closure failed.
    Dependency,
    /// The bundle loaded but the requested asset or scene is absent.
    NotFound,
    /// Invalid call or configuration, reported at the call site.
    Configuration,
}

/// Bundle loading error type
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BundleError {
    /// Transport reported a failure while fetching a bundle
    #[error("failed downloading bundle '{bundle}' from {url}: {reason}")]
    Transport {
        bundle: String,
        url: String,
        reason: String,
    },

    /// Fetched payload could not be decoded as a bundle
    #[error("'{bundle}' is not a valid bundle: {reason}")]
    InvalidBundle { bundle: String, reason: String },

    /// Local bundle file could not be opened
    #[error("failed to open bundle '{bundle}' at {path}")]
    OpenFailed { bundle: String, path: String },

    /// A bundle this one depends on failed
    #[error("dependency '{dependency}' of bundle '{bundle}' failed")]
    Dependency {
        bundle: String,
        dependency: String,
        #[source]
        source: Box<BundleError>,
    },

    /// Asset name missing from a loaded bundle
    #[error("there is no asset named '{asset}' in bundle '{bundle}'")]
    AssetNotFound { bundle: String, asset: String },

    /// Scene name missing from a loaded bundle
    #[error("there is no scene named '{scene}' in bundle '{bundle}'")]
    SceneNotFound { bundle: String, scene: String },

    /// No active variant matches any sibling of a variant group
    #[error("ambiguous variant for '{base}': none of {candidates:?} matches active variants {active:?}")]
    AmbiguousVariant {
        base: String,
        candidates: Vec<String>,
        active: Vec<String>,
    },

    /// Manifest declares a dependency cycle
    #[error("dependency cycle detected through bundle '{0}'")]
    DependencyCycle(String),

    /// Dependency resolution attempted before the manifest was published
    #[error("bundle manager is not initialized; call initialize() and wait for the manifest")]
    NotInitialized,

    /// Configuration changed after initialize()
    #[error("{0} must be configured before initialize()")]
    AlreadyInitialized(&'static str),

    /// Other invalid configuration or argument
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error (settings files, bundle files)
    #[error("IO error: {0}")]
    Io(String),

    /// Asset bytes could not be decoded into the requested type
    #[error("asset decode error: {0}")]
    Decode(String),
}

impl BundleError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::Transport { .. } | BundleError::Io(_) => ErrorKind::Transport,
            BundleError::InvalidBundle { .. }
            | BundleError::OpenFailed { .. }
            | BundleError::Decode(_) => ErrorKind::Validation,
            BundleError::Dependency { .. } => ErrorKind::Dependency,
            BundleError::AssetNotFound { .. } | BundleError::SceneNotFound { .. } => {
                ErrorKind::NotFound
            }
            BundleError::AmbiguousVariant { .. }
            | BundleError::DependencyCycle(_)
            | BundleError::NotInitialized
            | BundleError::AlreadyInitialized(_)
            | BundleError::Config(_) => ErrorKind::Configuration,
        }
    }

    /// Wrap `cause` as the failure of `dependency` seen from `bundle`.
    pub fn dependency(bundle: &str, dependency: &str, cause: BundleError) -> Self {
        BundleError::Dependency {
            bundle: bundle.to_string(),
            dependency: dependency.to_string(),
            source: Box::new(cause),
        }
    }

    /// Innermost error of a dependency chain.
    pub fn root_cause(&self) -> &BundleError {
        match self {
            BundleError::Dependency { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for BundleError {
    fn from(err: std::io::Error) -> Self {
        BundleError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(err: serde_json::Error) -> Self {
        BundleError::Decode(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BundleError>;
