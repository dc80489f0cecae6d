// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-resolve
//!
//! Node.js-style module resolution over a virtual file system.
//!
//! - Builtin short-circuit (`fs`, `node:path`, ...) without file system access
//! - Extension probing in configured order
//! - `node_modules` package lookup with scoped names and subpaths
//! - `main` / `source` entry selection through a [`SourceFieldPolicy`]
//! - Per-resolver package.json cache
//!
//! ```rust,ignore
//! use spacey_resolve::{MemoryFs, Resolver};
//! use std::{path::Path, sync::Arc};
//!
//! let fs = Arc::new(MemoryFs::new().with_file("/app/foo.js", ""));
//! let resolver = Resolver::new(fs);
//! let result = resolver.resolve("./foo", Path::new("/app/index.js"))?;
//! assert_eq!(result.path(), Some(Path::new("/app/foo.js")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins;
pub mod error;
pub mod fs;
pub mod package;
pub mod path;
mod resolver;

pub use builtins::BuiltinSet;
pub use error::{ResolveError, Result};
pub use fs::{FileKind, FileStat, FileSystem, MemoryFs, OsFs};
pub use package::{PackageCache, PackageJson, SourceFieldPolicy};
pub use resolver::{
    DEFAULT_EXTENSIONS, NODE_MODULES, ResolveResult, Resolved, Resolver, ResolverOptions,
};
