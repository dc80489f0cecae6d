// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module resolution

use std::path::PathBuf;
use thiserror::Error;

/// Result type for resolution
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur while resolving a specifier
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every candidate was tried and none exists
    #[error("Cannot find module '{specifier}' from '{}'", from.display())]
    NotFound {
        /// Requested specifier
        specifier: String,
        /// Referencing file
        from: PathBuf,
    },

    /// A package.json could not be parsed
    #[error("Invalid package.json at '{}': {source}", path.display())]
    InvalidPackage {
        /// Manifest path
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    /// Create a not-found error
    pub fn not_found(specifier: impl Into<String>, from: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            specifier: specifier.into(),
            from: from.into(),
        }
    }

    /// Whether this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
