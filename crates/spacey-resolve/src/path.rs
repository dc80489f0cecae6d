// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical path helpers
//!
//! Resolution never canonicalizes through the real file system, so `.` and
//! `..` segments are folded here. The string functions follow POSIX
//! `path` module semantics and back the sandbox's `path` builtin.

use std::path::{Component, Path, PathBuf};

/// Fold `.` and `..` components without touching the file system.
///
/// `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    result.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root && result.has_root() {
                    continue;
                }
                if at_root || result.ends_with("..") {
                    result.push("..");
                } else {
                    result.pop();
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// Whether the final path segment carries an extension (`.js`, `.json`, ...).
pub fn has_extension(path: &Path) -> bool {
    path.extension().is_some()
}

/// Append `suffix` to the last segment of `path` (`foo` + `.js` -> `foo.js`).
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// path.normalize(path)
pub fn normalize(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    let is_absolute = path.starts_with('/');

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if !components.is_empty() && components.last() != Some(&"..") {
                    components.pop();
                } else if !is_absolute {
                    components.push("..");
                }
            }
            c => components.push(c),
        }
    }

    let result = components.join("/");
    if is_absolute {
        format!("/{}", result)
    } else if result.is_empty() {
        ".".to_string()
    } else {
        result
    }
}

/// path.join(...paths)
pub fn join(paths: &[&str]) -> String {
    let joined = paths
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        normalize(&joined)
    }
}

/// path.resolve(...paths), anchored at `cwd` instead of the process cwd.
pub fn resolve(cwd: &str, paths: &[&str]) -> String {
    let mut result = cwd.to_string();
    for p in paths {
        if p.starts_with('/') {
            result = p.to_string();
        } else if !p.is_empty() {
            result = format!("{}/{}", result, p);
        }
    }
    normalize(&result)
}

/// path.dirname(path)
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// path.basename(path, ext?)
pub fn basename(path: &str, ext: Option<&str>) -> String {
    let trimmed = path.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or_default();
    match ext {
        Some(ext) if !ext.is_empty() && name.len() > ext.len() && name.ends_with(ext) => {
            name[..name.len() - ext.len()].to_string()
        }
        _ => name.to_string(),
    }
}

/// path.extname(path)
pub fn extname(path: &str) -> String {
    let name = basename(path, None);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx..].to_string(),
    }
}

/// path.isAbsolute(path)
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}
