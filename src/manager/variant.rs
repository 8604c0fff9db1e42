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

//! Variant resolution

use crate::error::{BundleError, Result};
use crate::manifest::Manifest;

/// Pick the concrete bundle for `name` given the active variant tags.
///
/// The first active tag that a sibling of the variant group carries wins.
/// Names outside any variant group are returned unchanged. When no active
/// tag matches, a concrete sibling name resolves to itself and a base name
/// is reported as ambiguous.
pub fn resolve_variant(manifest: &Manifest, name: &str, active: &[String]) -> Result<String> {
    let base = manifest.variant_base(name);
    let mut best: Option<(usize, &str)> = None;
    let mut candidates = Vec::new();

    for (candidate, tag) in manifest.variants_of(base) {
        candidates.push(candidate.to_string());
        if let Some(rank) = active.iter().position(|t| t == tag) {
            if best.is_none_or(|(best_rank, _)| rank < best_rank) {
                best = Some((rank, candidate));
            }
        }
    }

    if candidates.is_empty() {
        return Ok(name.to_string());
    }

    match best {
        Some((_, chosen)) => {
            if chosen != name {
                tracing::debug!(requested = %name, resolved = %chosen, "variant remapped");
            }
            Ok(chosen.to_string())
        }
        None if manifest.contains(name) => Ok(name.to_string()),
        None => Err(BundleError::AmbiguousVariant {
            base: base.to_string(),
            candidates,
            active: active.to_vec(),
        }),
    }
}
