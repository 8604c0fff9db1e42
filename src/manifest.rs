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

//! Bundle manifest: dependency graph and variant groups
//!
//! The manifest is stored as a JSON asset inside the platform bundle and is
//! read-only once published to the manager.

use crate::asset::Asset;
use crate::error::{BundleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Variant membership of a bundle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTag {
    /// Name shared by all siblings of the group
    pub base: String,
    /// Tag distinguishing this sibling (e.g. `hd`)
    pub tag: String,
}

/// Per-bundle manifest record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantTag>,
}

/// Authoritative map of bundle names to dependencies and variants
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    bundles: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle with its direct dependencies
    pub fn with_bundle<I, S>(mut self, name: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundles.insert(
            name.into(),
            ManifestEntry {
                dependencies: dependencies.into_iter().map(Into::into).collect(),
                ..ManifestEntry::default()
            },
        );
        self
    }

    /// Add a variant sibling of `base` tagged `tag`
    pub fn with_variant<I, S>(
        mut self,
        name: impl Into<String>,
        base: impl Into<String>,
        tag: impl Into<String>,
        dependencies: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bundles.insert(
            name.into(),
            ManifestEntry {
                dependencies: dependencies.into_iter().map(Into::into).collect(),
                hash: None,
                variant: Some(VariantTag {
                    base: base.into(),
                    tag: tag.into(),
                }),
            },
        );
        self
    }

    /// Insert or replace a full entry
    pub fn insert(&mut self, name: impl Into<String>, entry: ManifestEntry) {
        self.bundles.insert(name.into(), entry);
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BundleError::Config(format!("manifest serialization failed: {e}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    pub fn entry(&self, name: &str) -> Option<&ManifestEntry> {
        self.bundles.get(name)
    }

    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Content hash of a bundle, used as the transport cache key
    pub fn hash(&self, name: &str) -> Option<&str> {
        self.bundles.get(name).and_then(|e| e.hash.as_deref())
    }

    /// Direct dependencies; empty for unknown bundles
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.bundles
            .get(name)
            .map(|e| e.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Transitive dependencies, every bundle listed after its own dependencies
    pub fn all_dependencies(&self, name: &str) -> Result<Vec<String>> {
        self.all_dependencies_with(name, |dep| Ok(dep.to_string()))
    }

    /// Transitive dependencies with every edge passed through `resolve`
    /// (variant remapping) before it is followed
    pub fn all_dependencies_with<F>(&self, name: &str, mut resolve: F) -> Result<Vec<String>>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut walk = Walk {
            order: Vec::new(),
            done: BTreeSet::new(),
            visiting: vec![name.to_string()],
        };
        for dep in self.dependencies(name) {
            let dep = resolve(dep)?;
            self.visit(&dep, &mut walk, &mut resolve)?;
        }
        Ok(walk.order)
    }

    fn visit<F>(&self, name: &str, walk: &mut Walk, resolve: &mut F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        if walk.done.contains(name) {
            return Ok(());
        }
        if walk.visiting.iter().any(|n| n == name) {
            return Err(BundleError::DependencyCycle(name.to_string()));
        }
        walk.visiting.push(name.to_string());
        for dep in self.dependencies(name) {
            let dep = resolve(dep)?;
            self.visit(&dep, walk, resolve)?;
        }
        walk.visiting.pop();
        walk.done.insert(name.to_string());
        walk.order.push(name.to_string());
        Ok(())
    }

    /// All bundles that belong to a variant group
    pub fn bundles_with_variant(&self) -> impl Iterator<Item = (&str, &VariantTag)> {
        self.bundles
            .iter()
            .filter_map(|(name, e)| e.variant.as_ref().map(|v| (name.as_str(), v)))
    }

    /// Siblings of variant group `base`
    pub fn variants_of<'a>(&'a self, base: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.bundles_with_variant()
            .filter(move |(_, v)| v.base == base)
            .map(|(name, v)| (name, v.tag.as_str()))
    }

    /// Variant group a name refers to: the group a concrete sibling belongs
    /// to, or the name itself when used as a base name
    pub fn variant_base<'a>(&'a self, name: &'a str) -> &'a str {
        self.bundles
            .get(name)
            .and_then(|e| e.variant.as_ref())
            .map(|v| v.base.as_str())
            .unwrap_or(name)
    }
}

struct Walk {
    order: Vec<String>,
    done: BTreeSet<String>,
    visiting: Vec<String>,
}

impl Asset for Manifest {
    const TYPE_TAG: &'static str = "BundleManifest";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Manifest {
        Manifest::new()
            .with_bundle("scene", ["props", "textures"])
            .with_bundle("props", ["materials"])
            .with_bundle("textures", Vec::<String>::new())
            .with_bundle("materials", ["textures"])
    }

    #[test]
    fn test_all_dependencies_orders_dependencies_first() {
        let manifest = chain();
        let deps = manifest.all_dependencies("scene").unwrap();
        assert_eq!(deps, vec!["textures", "materials", "props"]);

        let pos = |n: &str| deps.iter().position(|d| d == n).unwrap();
        assert!(pos("textures") < pos("materials"));
        assert!(pos("materials") < pos("props"));
    }

    #[test]
    fn test_unknown_bundle_has_no_dependencies() {
        let manifest = chain();
        assert!(manifest.dependencies("ghost").is_empty());
        assert!(manifest.all_dependencies("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let manifest = Manifest::new()
            .with_bundle("a", ["b"])
            .with_bundle("b", ["c"])
            .with_bundle("c", ["a"]);
        assert!(matches!(
            manifest.all_dependencies("a"),
            Err(BundleError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_resolver_applied_to_every_edge() {
        let manifest = Manifest::new()
            .with_bundle("scene", ["myassets"])
            .with_variant("myassets_hd", "myassets", "hd", ["shaders"])
            .with_bundle("shaders", Vec::<String>::new());

        let deps = manifest
            .all_dependencies_with("scene", |dep| {
                Ok(if dep == "myassets" { "myassets_hd".to_string() } else { dep.to_string() })
            })
            .unwrap();
        assert_eq!(deps, vec!["shaders", "myassets_hd"]);
    }

    #[test]
    fn test_json_round_trip_keeps_variants() {
        let json = r#"{
            "bundles": {
                "myassets_hd": { "dependencies": [], "variant": { "base": "myassets", "tag": "hd" } },
                "myassets_sd": { "variant": { "base": "myassets", "tag": "sd" }, "hash": "abc" },
                "scene": { "dependencies": ["myassets"] }
            }
        }"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.hash("myassets_sd"), Some("abc"));
        assert_eq!(manifest.variants_of("myassets").count(), 2);
        assert_eq!(manifest.variant_base("myassets_hd"), "myassets");
        assert_eq!(manifest.variant_base("scene"), "scene");

        let decoded = <Manifest as Asset>::from_bytes(manifest.to_json().unwrap().as_bytes());
        assert_eq!(decoded.unwrap(), manifest);
    }
}
