// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! package.json manifests and the per-resolver manifest cache

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ResolveError, Result};
use crate::fs::FileSystem;
use crate::path::normalize_path;

/// Manifest file name
pub const PACKAGE_JSON: &str = "package.json";

/// The parts of a package.json the resolver reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default, deserialize_with = "string_or_none")]
    pub name: Option<String>,
    /// CommonJS entry point
    #[serde(default, deserialize_with = "string_or_none")]
    pub main: Option<String>,
    /// Untranspiled entry point used for first-party packages in development
    #[serde(default, deserialize_with = "string_or_none")]
    pub source: Option<String>,
    /// Directory holding the manifest
    #[serde(skip)]
    pub dir: PathBuf,
}

impl PackageJson {
    /// Parse a manifest read from `dir`
    pub fn parse(dir: &Path, contents: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let mut pkg: PackageJson = serde_json::from_slice(contents)?;
        pkg.dir = dir.to_path_buf();
        Ok(pkg)
    }

    /// Path of the manifest file itself
    pub fn file(&self) -> PathBuf {
        self.dir.join(PACKAGE_JSON)
    }
}

/// Non-string fields (`"main": false`, `"source": ["a"]`) count as absent
fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// When to prefer a package's `source` field over `main`
///
/// First-party packages are developed against their untranspiled sources,
/// so outside production builds a package whose name starts with
/// `internal_prefix` resolves to `source` unless it is listed in `excluded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFieldPolicy {
    /// Production builds always use `main`
    pub production: bool,
    /// Name prefix of first-party packages
    pub internal_prefix: String,
    /// First-party packages that still resolve to `main`
    pub excluded: Vec<String>,
}

impl Default for SourceFieldPolicy {
    fn default() -> Self {
        Self {
            production: false,
            internal_prefix: "@spacey/".to_string(),
            excluded: Vec::new(),
        }
    }
}

impl SourceFieldPolicy {
    /// A policy that never picks `source`
    pub fn disabled() -> Self {
        Self {
            production: true,
            ..Self::default()
        }
    }

    /// Whether `pkg` should resolve through its `source` field
    pub fn prefers_source(&self, pkg: &PackageJson) -> bool {
        if self.production || pkg.source.is_none() {
            return false;
        }
        match pkg.name.as_deref() {
            Some(name) => {
                !self.internal_prefix.is_empty()
                    && name.starts_with(&self.internal_prefix)
                    && !self.excluded.iter().any(|e| e == name)
            }
            None => false,
        }
    }

    /// Absolute entry path of the package in `dir`
    ///
    /// Missing, empty, `.` and `./` entries fall back to `index`; candidate
    /// expansion happens later, so an `index` that does not exist only fails
    /// once every extension has been tried.
    pub fn package_entry(&self, dir: &Path, pkg: Option<&PackageJson>) -> PathBuf {
        let entry = pkg.and_then(|pkg| {
            if self.prefers_source(pkg) {
                pkg.source.as_deref()
            } else {
                pkg.main.as_deref()
            }
        });
        match entry {
            Some(entry) if !matches!(entry.trim(), "" | "." | "./") => {
                normalize_path(&dir.join(entry))
            }
            _ => dir.join("index"),
        }
    }
}

/// Manifests keyed by package directory
///
/// Entries are never invalidated: one resolver sees one stable file system.
#[derive(Debug, Default)]
pub struct PackageCache {
    packages: DashMap<PathBuf, Arc<PackageJson>>,
}

impl PackageCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the manifest in `dir`, parsing it only on the first request
    pub fn read(&self, fs: &dyn FileSystem, dir: &Path) -> Result<Arc<PackageJson>> {
        if let Some(pkg) = self.packages.get(dir) {
            return Ok(Arc::clone(pkg.value()));
        }

        let file = dir.join(PACKAGE_JSON);
        let contents = fs.read_file_sync(&file)?;
        let pkg = PackageJson::parse(dir, &contents)
            .map_err(|source| ResolveError::InvalidPackage { path: file, source })?;
        let pkg = Arc::new(pkg);
        self.packages.insert(dir.to_path_buf(), Arc::clone(&pkg));
        tracing::trace!(dir = %dir.display(), name = ?pkg.name, "cached package.json");
        Ok(pkg)
    }

    /// Whether `dir` has been cached
    pub fn contains(&self, dir: &Path) -> bool {
        self.packages.contains_key(dir)
    }

    /// Number of cached manifests
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn pkg(json: &str) -> PackageJson {
        PackageJson::parse(Path::new("/pkg"), json.as_bytes()).unwrap()
    }

    #[test]
    fn test_non_string_fields_are_ignored() {
        let pkg = pkg(r#"{"name": "a", "main": false, "source": ["x"]}"#);
        assert_eq!(pkg.name.as_deref(), Some("a"));
        assert_eq!(pkg.main, None);
        assert_eq!(pkg.source, None);
    }

    #[test]
    fn test_entry_defaults_to_index() {
        let policy = SourceFieldPolicy::default();
        let dir = Path::new("/pkg");

        assert_eq!(policy.package_entry(dir, None), dir.join("index"));
        assert_eq!(policy.package_entry(dir, Some(&pkg("{}"))), dir.join("index"));
        assert_eq!(
            policy.package_entry(dir, Some(&pkg(r#"{"main": "./"}"#))),
            dir.join("index")
        );
        assert_eq!(
            policy.package_entry(dir, Some(&pkg(r#"{"main": "lib/a.js"}"#))),
            dir.join("lib/a.js")
        );
        assert_eq!(
            policy.package_entry(dir, Some(&pkg(r#"{"main": "./lib/../a.js"}"#))),
            dir.join("a.js")
        );
    }

    #[test]
    fn test_source_preference() {
        let policy = SourceFieldPolicy {
            production: false,
            internal_prefix: "@acme/".to_string(),
            excluded: vec!["@acme/watcher".to_string()],
        };
        let internal = pkg(r#"{"name": "@acme/core", "main": "lib.js", "source": "src.js"}"#);
        let excluded = pkg(r#"{"name": "@acme/watcher", "main": "lib.js", "source": "src.js"}"#);
        let external = pkg(r#"{"name": "left-pad", "main": "lib.js", "source": "src.js"}"#);

        assert!(policy.prefers_source(&internal));
        assert!(!policy.prefers_source(&excluded));
        assert!(!policy.prefers_source(&external));

        let main_only = pkg(r#"{"name": "@acme/core", "main": "lib.js"}"#);
        let unrelated = pkg(r#"{"name": "x", "main": "lib.js"}"#);
        assert!(!policy.prefers_source(&main_only));
        assert_eq!(
            policy.package_entry(Path::new("/pkg"), Some(&main_only)),
            policy.package_entry(Path::new("/pkg"), Some(&unrelated))
        );

        let production = SourceFieldPolicy {
            production: true,
            ..policy
        };
        assert!(!production.prefers_source(&internal));
    }

    #[test]
    fn test_cache_parses_once() {
        let fs = MemoryFs::new().with_file("/pkg/package.json", r#"{"name": "p"}"#);
        let cache = PackageCache::new();

        let first = cache.read(&fs, Path::new("/pkg")).unwrap();
        let reads = fs.accesses();
        let second = cache.read(&fs, Path::new("/pkg")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.accesses(), reads);
        assert_eq!(first.file(), PathBuf::from("/pkg/package.json"));
    }

    #[test]
    fn test_invalid_manifest() {
        let fs = MemoryFs::new().with_file("/pkg/package.json", "{ nope");
        let cache = PackageCache::new();

        let err = cache.read(&fs, Path::new("/pkg")).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPackage { .. }));
        assert!(cache.is_empty());
    }
}
