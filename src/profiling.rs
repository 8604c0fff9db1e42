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

//! # Profiling
//!
//! Every download, settle and release in the manager is reported through
//! `tracing` events. Nothing is printed until a subscriber is installed.
//! Enable the `profiling` feature to get the helpers below:
//!
//! ```toml
//! [dependencies]
//! archetype_bundles = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! ```ignore
//! archetype_bundles::profiling::init_tracing("archetype_bundles=debug")?;
//!
//! // or, to a file that outlives the process' stdout
//! let _guard = archetype_bundles::profiling::init_file_tracing("logs", "bundles.log", "info")?;
//! ```
//!
//! `RUST_LOG` overrides the filter passed in. Keep the returned guard alive
//! for as long as events should reach the file.

#[cfg(feature = "profiling")]
use crate::error::{BundleError, Result};
#[cfg(feature = "profiling")]
use std::path::Path;
#[cfg(feature = "profiling")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "profiling")]
fn env_filter(default: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default)
            .map_err(|e| BundleError::Config(format!("invalid log filter '{default}': {e}"))),
    }
}

/// Install a stdout subscriber
#[cfg(feature = "profiling")]
pub fn init_tracing(filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .with_target(true)
        .try_init()
        .map_err(|e| BundleError::Config(format!("tracing already initialized: {e}")))
}

/// Install a subscriber writing JSON lines to `dir/file_name` on a
/// background thread
#[cfg(feature = "profiling")]
pub fn init_file_tracing(
    dir: impl AsRef<Path>,
    file_name: impl AsRef<Path>,
    filter: &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(dir.as_ref())?;
    let appender = tracing_appender::rolling::never(dir.as_ref(), file_name.as_ref());
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(env_filter(filter)?)
        .try_init()
        .map_err(|e| BundleError::Config(format!("tracing already initialized: {e}")))?;
    Ok(guard)
}
