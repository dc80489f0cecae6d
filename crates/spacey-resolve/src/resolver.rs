// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::builtins::BuiltinSet;
use crate::error::{ResolveError, Result};
use crate::fs::FileSystem;
use crate::package::{PACKAGE_JSON, PackageCache, PackageJson, SourceFieldPolicy};
use crate::path::{append_suffix, has_extension, normalize, normalize_path};

/// Extensions Node.js can load, in probing order
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".node"];

/// Directory searched for bare specifiers
pub const NODE_MODULES: &str = "node_modules";

/// What a specifier resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Builtin module, returned exactly as requested
    Builtin(String),
    /// Absolute path of an existing file
    File(PathBuf),
}

/// Result of module resolution
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// Resolved target
    pub resolved: Resolved,
    /// Manifest of the package the target belongs to
    pub pkg: Option<Arc<PackageJson>>,
}

impl ResolveResult {
    fn builtin(specifier: &str) -> Self {
        Self {
            resolved: Resolved::Builtin(specifier.to_string()),
            pkg: None,
        }
    }

    /// Resolved file, if the target is not a builtin
    pub fn path(&self) -> Option<&Path> {
        match &self.resolved {
            Resolved::File(path) => Some(path),
            Resolved::Builtin(_) => None,
        }
    }

    /// Builtin name without any `node:` prefix
    pub fn builtin_name(&self) -> Option<&str> {
        match &self.resolved {
            Resolved::Builtin(name) => Some(BuiltinSet::canonical_name(name)),
            Resolved::File(_) => None,
        }
    }

    /// Whether the target is a builtin
    pub fn is_builtin(&self) -> bool {
        matches!(self.resolved, Resolved::Builtin(_))
    }
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Extensions probed during candidate expansion, in order
    pub extensions: Vec<String>,
    /// Names that are never resolved to files
    pub builtins: Arc<BuiltinSet>,
    /// `source` versus `main` selection
    pub source_policy: SourceFieldPolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            builtins: BuiltinSet::node(),
            source_policy: SourceFieldPolicy::default(),
        }
    }
}

impl ResolverOptions {
    /// Replace the probed extensions (`"js"` and `".js"` are both accepted)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref();
                if e.starts_with('.') {
                    e.to_string()
                } else {
                    format!(".{}", e)
                }
            })
            .collect();
        self
    }

    /// Replace the source-field policy
    pub fn with_source_policy(mut self, policy: SourceFieldPolicy) -> Self {
        self.source_policy = policy;
        self
    }
}

/// Module resolver implementing the Node.js resolution algorithm
///
/// One resolver is one resolution session: its manifest cache assumes the
/// file system does not change underneath it.
#[derive(Debug)]
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    options: ResolverOptions,
    packages: PackageCache,
}

impl Resolver {
    /// Create a resolver with default options
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_options(fs, ResolverOptions::default())
    }

    /// Create a resolver with custom options
    pub fn with_options(fs: Arc<dyn FileSystem>, options: ResolverOptions) -> Self {
        Self {
            fs,
            options,
            packages: PackageCache::new(),
        }
    }

    /// Resolver options
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Manifest cache
    pub fn packages(&self) -> &PackageCache {
        &self.packages
    }

    /// File system used for probing
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Check if a specifier names a builtin
    pub fn is_builtin(&self, name: &str) -> bool {
        self.options.builtins.contains(name)
    }

    /// Resolve `specifier` as requested from the file `from`
    pub fn resolve(&self, specifier: &str, from: &Path) -> Result<ResolveResult> {
        if self.is_builtin(specifier) {
            trace!(specifier, "builtin");
            return Ok(ResolveResult::builtin(specifier));
        }

        let base = from.parent().unwrap_or(Path::new("/"));
        let result = if is_path_specifier(specifier) {
            let target = normalize_path(&base.join(specifier));
            self.resolve_path(&target)?.map(|(path, pkg)| {
                let pkg = pkg.or_else(|| path.parent().and_then(|dir| self.find_package(dir)));
                ResolveResult {
                    resolved: Resolved::File(path),
                    pkg,
                }
            })
        } else {
            self.resolve_package(specifier, base)?
        };

        match result {
            Some(result) => {
                debug!(specifier, from = %from.display(), resolved = ?result.resolved, "resolved");
                Ok(result)
            }
            None => Err(ResolveError::not_found(specifier, from)),
        }
    }

    /// Candidate files for `file`, in probing order
    ///
    /// A target that already has an extension is tried verbatim first; one
    /// without is tried bare only after every extension.
    pub fn expand_file(&self, file: &Path) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self
            .options
            .extensions
            .iter()
            .map(|ext| append_suffix(file, ext))
            .collect();
        if has_extension(file) {
            candidates.insert(0, file.to_path_buf());
        } else {
            candidates.push(file.to_path_buf());
        }
        candidates
    }

    /// Split a bare specifier into package name and subpath
    ///
    /// Scoped names (`@scope/name`) count as one package name.
    pub fn module_parts(specifier: &str) -> (String, Option<String>) {
        let normalized = normalize(specifier);
        let mut slashes = normalized.match_indices('/').map(|(idx, _)| idx);
        let split_on = if normalized.starts_with('@') {
            slashes.nth(1)
        } else {
            slashes.next()
        };

        match split_on {
            Some(idx) => {
                let subpath = &normalized[idx + 1..];
                (
                    normalized[..idx].to_string(),
                    (!subpath.is_empty()).then(|| subpath.to_string()),
                )
            }
            None => (normalized, None),
        }
    }

    /// Entry path of the package in `dir`
    pub fn package_entry(&self, dir: &Path, pkg: Option<&PackageJson>) -> PathBuf {
        self.options.source_policy.package_entry(dir, pkg)
    }

    /// Nearest manifest at or above `dir`, without leaving the current
    /// `node_modules` folder
    pub fn find_package(&self, dir: &Path) -> Option<Arc<PackageJson>> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            if dir.file_name().is_some_and(|name| name == NODE_MODULES) {
                break;
            }
            if self.fs.is_file(&dir.join(PACKAGE_JSON)) {
                if let Ok(pkg) = self.packages.read(self.fs.as_ref(), dir) {
                    return Some(pkg);
                }
            }
            current = dir.parent();
        }
        None
    }

    /// First existing candidate for `target`
    fn resolve_file(&self, target: &Path) -> Option<PathBuf> {
        self.expand_file(target).into_iter().find(|candidate| {
            let exists = self.fs.is_file(candidate);
            trace!(candidate = %candidate.display(), exists, "probe");
            exists
        })
    }

    /// Resolve a file target, falling back to directory resolution
    fn resolve_path(&self, target: &Path) -> Result<Option<(PathBuf, Option<Arc<PackageJson>>)>> {
        if let Some(file) = self.resolve_file(target) {
            return Ok(Some((file, None)));
        }
        if self.fs.is_dir(target) {
            return self.resolve_directory(target);
        }
        Ok(None)
    }

    /// Resolve a directory through its manifest entry, then its index
    fn resolve_directory(&self, dir: &Path) -> Result<Option<(PathBuf, Option<Arc<PackageJson>>)>> {
        let pkg = if self.fs.is_file(&dir.join(PACKAGE_JSON)) {
            Some(self.packages.read(self.fs.as_ref(), dir)?)
        } else {
            None
        };

        let index = dir.join("index");
        let entry = self.package_entry(dir, pkg.as_deref());
        let mut targets = vec![entry.clone()];
        if self.fs.is_dir(&entry) {
            targets.push(entry.join("index"));
        }
        if entry != index {
            targets.push(index);
        }

        Ok(targets
            .iter()
            .find_map(|target| self.resolve_file(target))
            .map(|file| (file, pkg)))
    }

    /// Resolve a bare specifier through `node_modules` lookup
    ///
    /// Each `node_modules` folder from `base` up to the root is tried in
    /// turn: first `<folder>/<specifier>` as a file, then the package
    /// directory `<folder>/<name>`.
    fn resolve_package(&self, specifier: &str, base: &Path) -> Result<Option<ResolveResult>> {
        let (name, subpath) = Self::module_parts(specifier);
        let mut current = Some(base);
        while let Some(dir) = current {
            current = dir.parent();
            if dir.file_name().is_some_and(|n| n == NODE_MODULES) {
                continue;
            }

            let pkg_dir = dir.join(NODE_MODULES).join(&name);
            let target = match &subpath {
                Some(subpath) => normalize_path(&pkg_dir.join(subpath)),
                None => pkg_dir.clone(),
            };
            if let Some(file) = self.resolve_file(&target) {
                let pkg = file.parent().and_then(|parent| self.find_package(parent));
                return Ok(Some(ResolveResult {
                    resolved: Resolved::File(file),
                    pkg,
                }));
            }
            if !self.fs.is_dir(&pkg_dir) {
                continue;
            }
            trace!(package = %name, dir = %pkg_dir.display(), "found package");

            let resolved = match &subpath {
                Some(_) if self.fs.is_dir(&target) => self
                    .resolve_directory(&target)?
                    .map(|(path, pkg)| (path, pkg.or_else(|| self.find_package(&pkg_dir)))),
                Some(_) => None,
                None => self.resolve_directory(&pkg_dir)?,
            };
            return Ok(resolved.map(|(path, pkg)| ResolveResult {
                resolved: Resolved::File(path),
                pkg,
            }));
        }
        Ok(None)
    }
}

/// Relative (`./x`, `../x`, `.`, `..`) or absolute specifiers name files
fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn resolver(fs: MemoryFs) -> (Arc<MemoryFs>, Resolver) {
        let fs = Arc::new(fs);
        let resolver = Resolver::new(fs.clone());
        (fs, resolver)
    }

    fn resolve(resolver: &Resolver, specifier: &str, from: &str) -> PathBuf {
        resolver
            .resolve(specifier, Path::new(from))
            .unwrap()
            .path()
            .unwrap()
            .to_path_buf()
    }

    #[test]
    fn test_builtin_skips_file_system() {
        let (fs, resolver) = resolver(MemoryFs::new().with_file("/app/fs.js", ""));

        for name in ["fs", "path", "node:fs", "node:test"] {
            let result = resolver.resolve(name, Path::new("/app/index.js")).unwrap();
            assert_eq!(result.resolved, Resolved::Builtin(name.to_string()));
            assert!(result.pkg.is_none());
        }
        assert_eq!(fs.accesses(), 0);
    }

    #[test]
    fn test_relative_file() {
        let (_, resolver) = resolver(MemoryFs::new().with_file("/app/foo.js", ""));
        assert_eq!(resolve(&resolver, "./foo", "/app/index.js"), PathBuf::from("/app/foo.js"));
        assert_eq!(
            resolve(&resolver, "../foo", "/app/src/index.js"),
            PathBuf::from("/app/foo.js")
        );
    }

    #[test]
    fn test_explicit_extension_tried_first() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/data.json", "{}")
                .with_file("/app/data.json.js", ""),
        );
        assert_eq!(
            resolve(&resolver, "./data.json", "/app/index.js"),
            PathBuf::from("/app/data.json")
        );
    }

    #[test]
    fn test_expand_file_order() {
        let (_, resolver) = resolver(MemoryFs::new());

        assert_eq!(
            resolver.expand_file(Path::new("/a/b")),
            vec![
                PathBuf::from("/a/b.js"),
                PathBuf::from("/a/b.json"),
                PathBuf::from("/a/b.node"),
                PathBuf::from("/a/b"),
            ]
        );
        assert_eq!(
            resolver.expand_file(Path::new("/a/b.css")),
            vec![
                PathBuf::from("/a/b.css"),
                PathBuf::from("/a/b.css.js"),
                PathBuf::from("/a/b.css.json"),
                PathBuf::from("/a/b.css.node"),
            ]
        );
    }

    #[test]
    fn test_custom_extensions() {
        let fs = Arc::new(MemoryFs::new().with_file("/app/x.ts", "").with_file("/app/x.js", ""));
        let resolver = Resolver::with_options(
            fs,
            ResolverOptions::default().with_extensions(["ts", ".js"]),
        );
        assert_eq!(resolve(&resolver, "./x", "/app/index.js"), PathBuf::from("/app/x.ts"));
    }

    #[test]
    fn test_package_main() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/mypkg/package.json", r#"{"main": "lib/entry.js"}"#)
                .with_file("/app/node_modules/mypkg/lib/entry.js", ""),
        );
        let result = resolver.resolve("mypkg", Path::new("/app/index.js")).unwrap();
        assert_eq!(
            result.path(),
            Some(Path::new("/app/node_modules/mypkg/lib/entry.js"))
        );
        assert_eq!(
            result.pkg.unwrap().dir,
            PathBuf::from("/app/node_modules/mypkg")
        );
    }

    #[test]
    fn test_package_lookup_walks_up() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/node_modules/up/package.json", r#"{"main": "main"}"#)
                .with_file("/node_modules/up/main.js", ""),
        );
        assert_eq!(
            resolve(&resolver, "up", "/app/src/deep/index.js"),
            PathBuf::from("/node_modules/up/main.js")
        );
    }

    #[test]
    fn test_package_without_entry_uses_index() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/bare/package.json", r#"{"main": "."}"#)
                .with_file("/app/node_modules/bare/index.js", "")
                .with_file("/app/node_modules/nomanifest/index.json", "{}"),
        );
        assert_eq!(
            resolve(&resolver, "bare", "/app/index.js"),
            PathBuf::from("/app/node_modules/bare/index.js")
        );
        assert_eq!(
            resolve(&resolver, "nomanifest", "/app/index.js"),
            PathBuf::from("/app/node_modules/nomanifest/index.json")
        );
    }

    #[test]
    fn test_source_field_policy() {
        let fs = MemoryFs::new()
            .with_file(
                "/app/node_modules/@spacey/core/package.json",
                r#"{"name": "@spacey/core", "main": "lib/index.js", "source": "src/index.js"}"#,
            )
            .with_file("/app/node_modules/@spacey/core/lib/index.js", "")
            .with_file("/app/node_modules/@spacey/core/src/index.js", "")
            .with_file(
                "/app/node_modules/plain/package.json",
                r#"{"name": "plain", "main": "lib/index.js", "source": "src/index.js"}"#,
            )
            .with_file("/app/node_modules/plain/lib/index.js", "")
            .with_file("/app/node_modules/plain/src/index.js", "");
        let fs = Arc::new(fs);

        let dev = Resolver::new(fs.clone());
        assert_eq!(
            resolve(&dev, "@spacey/core", "/app/index.js"),
            PathBuf::from("/app/node_modules/@spacey/core/src/index.js")
        );
        assert_eq!(
            resolve(&dev, "plain", "/app/index.js"),
            PathBuf::from("/app/node_modules/plain/lib/index.js")
        );

        let prod = Resolver::with_options(
            fs,
            ResolverOptions::default().with_source_policy(SourceFieldPolicy::disabled()),
        );
        assert_eq!(
            resolve(&prod, "@spacey/core", "/app/index.js"),
            PathBuf::from("/app/node_modules/@spacey/core/lib/index.js")
        );
    }

    #[test]
    fn test_scoped_subpath() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/@scope/pkg/package.json", r#"{"name": "@scope/pkg"}"#)
                .with_file("/app/node_modules/@scope/pkg/lib/util.js", ""),
        );
        let result = resolver
            .resolve("@scope/pkg/lib/util", Path::new("/app/index.js"))
            .unwrap();
        assert_eq!(
            result.path(),
            Some(Path::new("/app/node_modules/@scope/pkg/lib/util.js"))
        );
        assert_eq!(result.pkg.unwrap().name.as_deref(), Some("@scope/pkg"));
    }

    #[test]
    fn test_module_parts() {
        assert_eq!(Resolver::module_parts("lodash"), ("lodash".to_string(), None));
        assert_eq!(
            Resolver::module_parts("lodash/get"),
            ("lodash".to_string(), Some("get".to_string()))
        );
        assert_eq!(
            Resolver::module_parts("@types/node"),
            ("@types/node".to_string(), None)
        );
        assert_eq!(
            Resolver::module_parts("@babel/core/lib/./index"),
            ("@babel/core".to_string(), Some("lib/index".to_string()))
        );
    }

    #[test]
    fn test_directory_index_and_owner_package() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/package.json", r#"{"name": "app"}"#)
                .with_file("/app/lib/index.js", ""),
        );
        let result = resolver.resolve("./lib", Path::new("/app/index.js")).unwrap();
        assert_eq!(result.path(), Some(Path::new("/app/lib/index.js")));
        assert_eq!(result.pkg.unwrap().name.as_deref(), Some("app"));
    }

    #[test]
    fn test_not_found() {
        let (_, resolver) = resolver(MemoryFs::new().with_file("/app/index.js", ""));

        let err = resolver.resolve("./missing", Path::new("/app/index.js")).unwrap_err();
        match err {
            ResolveError::NotFound { specifier, from } => {
                assert_eq!(specifier, "./missing");
                assert_eq!(from, PathBuf::from("/app/index.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(resolver
            .resolve("nope", Path::new("/app/index.js"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_manifest_cached_per_resolver() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/p/package.json", r#"{"main": "a.js"}"#)
                .with_file("/app/node_modules/p/a.js", ""),
        );
        resolve(&resolver, "p", "/app/index.js");
        resolve(&resolver, "p", "/app/other.js");
        assert!(resolver.packages().contains(Path::new("/app/node_modules/p")));
        assert_eq!(resolver.packages().len(), 1);
    }

    #[test]
    fn test_subpath_builtins_skip_file_system() {
        let (fs, resolver) = resolver(MemoryFs::new());

        for name in ["fs/promises", "path/posix", "util/types", "stream/promises"] {
            let result = resolver.resolve(name, Path::new("/app/index.js")).unwrap();
            assert_eq!(result.resolved, Resolved::Builtin(name.to_string()));
        }
        assert_eq!(fs.accesses(), 0);
    }

    #[test]
    fn test_dot_prefixed_main_is_normalized() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/p/package.json", r#"{"main": "./lib/entry.js"}"#)
                .with_file("/app/node_modules/p/lib/entry.js", "")
                .with_file("/app/node_modules/q/package.json", r#"{"main": "./lib/../index"}"#)
                .with_file("/app/node_modules/q/index.js", ""),
        );
        assert_eq!(
            resolve(&resolver, "p", "/app/index.js"),
            PathBuf::from("/app/node_modules/p/lib/entry.js")
        );
        assert_eq!(
            resolve(&resolver, "q", "/app/index.js"),
            PathBuf::from("/app/node_modules/q/index.js")
        );
    }

    #[test]
    fn test_internal_package_with_only_main() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file(
                    "/app/node_modules/@spacey/x/package.json",
                    r#"{"name": "@spacey/x", "main": "lib/main.js"}"#,
                )
                .with_file("/app/node_modules/@spacey/x/lib/main.js", "")
                .with_file("/app/node_modules/@spacey/x/index.js", ""),
        );
        assert_eq!(
            resolve(&resolver, "@spacey/x", "/app/index.js"),
            PathBuf::from("/app/node_modules/@spacey/x/lib/main.js")
        );
    }

    #[test]
    fn test_file_directly_in_node_modules() {
        let (_, resolver) = resolver(
            MemoryFs::new()
                .with_file("/app/node_modules/single.js", "")
                .with_file("/node_modules/shadowed/index.js", "")
                .with_file("/app/node_modules/shadowed.json", "{}"),
        );
        let result = resolver.resolve("single", Path::new("/app/src/index.js")).unwrap();
        assert_eq!(result.path(), Some(Path::new("/app/node_modules/single.js")));
        assert!(result.pkg.is_none());
        assert_eq!(
            resolve(&resolver, "shadowed", "/app/index.js"),
            PathBuf::from("/app/node_modules/shadowed.json")
        );
    }
}
