// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for sandboxed execution

use boa_engine::JsError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Errors that can occur while running bundles
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The bundle targets a runtime the sandbox cannot simulate
    #[error("Unknown target '{0}'")]
    UnsupportedTarget(String),

    /// The bundle's output format has no export extraction strategy
    #[error("Unable to run bundle with outputFormat '{0}'")]
    UnsupportedOutputFormat(String),

    /// A malformed bundle broke an execution invariant
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// An HTML entry references a script that is not in the bundle graph
    #[error("Bundle not found: {}", .0.display())]
    BundleNotFound(PathBuf),

    /// A deferred script or file read failed
    #[error("Failed to load '{}': {source}", path.display())]
    Load {
        /// File that could not be read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// A bundle or deferred script threw while evaluating
    #[error("Error in '{}': {message}", path.display())]
    Script {
        /// Script being evaluated
        path: PathBuf,
        /// Thrown value
        message: String,
    },

    /// JavaScript exception outside script evaluation
    #[error("{0}")]
    Js(String),

    /// Module resolution error
    #[error(transparent)]
    Resolve(#[from] spacey_resolve::ResolveError),

    /// JSON conversion error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Attach the script path to an engine error
    pub(crate) fn script(path: impl Into<PathBuf>, err: JsError) -> Self {
        Self::Script {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<JsError> for SandboxError {
    fn from(err: JsError) -> Self {
        Self::Js(err.to_string())
    }
}
