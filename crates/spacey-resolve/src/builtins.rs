// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reserved platform module names

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

/// Prefix that marks a specifier as a platform builtin regardless of name
pub const NODE_PREFIX: &str = "node:";

/// Node.js builtin modules
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Node.js builtins addressed by a subpath
pub const NODE_BUILTIN_SUBPATHS: &[&str] = &[
    "assert/strict",
    "dns/promises",
    "fs/promises",
    "inspector/promises",
    "path/posix",
    "path/win32",
    "readline/promises",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "timers/promises",
    "util/types",
];

static NODE: LazyLock<Arc<BuiltinSet>> = LazyLock::new(|| {
    Arc::new(BuiltinSet::new(
        NODE_BUILTINS.iter().chain(NODE_BUILTIN_SUBPATHS).copied(),
    ))
});

/// Immutable set of builtin module names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinSet {
    names: HashSet<String>,
}

impl BuiltinSet {
    /// Build a set from names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The Node.js builtin set, built once per process and shared
    pub fn node() -> Arc<BuiltinSet> {
        Arc::clone(&NODE)
    }

    /// Whether `name` is a builtin (`node:` prefixed names always are)
    pub fn contains(&self, name: &str) -> bool {
        name.starts_with(NODE_PREFIX) || self.names.contains(name)
    }

    /// Strip the `node:` prefix, if any
    pub fn canonical_name(name: &str) -> &str {
        name.strip_prefix(NODE_PREFIX).unwrap_or(name)
    }

    /// Number of named builtins
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set has no named builtins
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builtins() {
        let builtins = BuiltinSet::node();
        assert!(builtins.contains("fs"));
        assert!(builtins.contains("path"));
        assert!(builtins.contains("node:test"));
        assert!(!builtins.contains("lodash"));
        assert!(!builtins.contains("fs/extra"));
        for name in NODE_BUILTIN_SUBPATHS {
            assert!(builtins.contains(name), "{name}");
        }
        assert!(Arc::ptr_eq(&builtins, &BuiltinSet::node()));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(BuiltinSet::canonical_name("node:fs"), "fs");
        assert_eq!(BuiltinSet::canonical_name("fs"), "fs");
    }
}
