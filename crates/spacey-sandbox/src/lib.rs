// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-sandbox
//!
//! Runs the bundles of a build inside simulated runtimes and reads back what
//! they export.
//!
//! - Browser contexts: `window`, `document`, `fetch`, `atob`/`btoa`, script tags
//! - Process contexts: `module`, `exports`, `require`, `process`, an `fs` shim
//! - Hybrid contexts (Electron renderer): both on one global object
//! - Deferred loads drained at a single join point before extraction
//! - HTML entries run the local scripts they reference
//!
//! ```rust,ignore
//! use spacey_sandbox::{Bundle, Environment, Globals, RunOptions, Sandbox};
//! use spacey_resolve::MemoryFs;
//! use std::sync::Arc;
//!
//! let fs = Arc::new(MemoryFs::new().with_file("/dist/index.js", "module.exports = 42;"));
//! let bundle = Bundle::js("/dist/index.js", Environment::new("node", "commonjs"));
//! let outcome = Sandbox::new(fs)
//!     .run_bundles(&[bundle.clone()], &bundle, &Globals::new(), RunOptions::default())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
mod context;
pub mod error;
pub mod host;
pub mod html;
pub mod pending;
mod sandbox;

pub use bundle::{
    Bundle, BundleGraph, BundleType, ContextKind, EnvContext, Environment, ExportStrategy,
    OutputFormat,
};
pub use context::{ConsoleLevel, ConsoleMessage, ExecutionContext};
pub use error::{Result, SandboxError};
pub use host::{HostModuleFactory, HostModules};
pub use sandbox::{Exports, Globals, Outcome, RunOptions, Sandbox, SandboxConfig};

/// Engine value type, re-exported for callers inspecting exports
pub use boa_engine::JsValue;
