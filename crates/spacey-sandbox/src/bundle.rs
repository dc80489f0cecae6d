// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bundle graph model
//!
//! The bundler itself lives elsewhere; the sandbox only needs each bundle's
//! file, type and target environment. A graph is usually read from a JSON
//! manifest written by the bundler under test.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SandboxError};

/// Kind of file a bundle produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    /// JavaScript
    #[default]
    Js,
    /// HTML page referencing script bundles
    Html,
    /// Stylesheet
    Css,
    /// Anything else
    #[serde(other)]
    Other,
}

/// Runtime a bundle was built for
///
/// Unknown names are kept so that the failure surfaces when the bundle is
/// run, not when the manifest is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvContext {
    /// Browser main thread
    #[default]
    Browser,
    /// Dedicated web worker
    WebWorker,
    /// Service worker
    ServiceWorker,
    /// Node.js
    Node,
    /// Electron main process
    ElectronMain,
    /// Electron renderer (browser globals plus Node.js integration)
    ElectronRenderer,
    /// Unrecognized runtime
    Other(String),
}

impl From<String> for EnvContext {
    fn from(s: String) -> Self {
        match s.as_str() {
            "browser" => Self::Browser,
            "web-worker" => Self::WebWorker,
            "service-worker" => Self::ServiceWorker,
            "node" => Self::Node,
            "electron-main" => Self::ElectronMain,
            "electron-renderer" => Self::ElectronRenderer,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for EnvContext {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<EnvContext> for String {
    fn from(ctx: EnvContext) -> Self {
        ctx.to_string()
    }
}

impl fmt::Display for EnvContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Browser => "browser",
            Self::WebWorker => "web-worker",
            Self::ServiceWorker => "service-worker",
            Self::Node => "node",
            Self::ElectronMain => "electron-main",
            Self::ElectronRenderer => "electron-renderer",
            Self::Other(s) => s,
        })
    }
}

/// How a bundle's code is wrapped on disk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    /// Plain script that publishes through globals
    #[default]
    Global,
    /// CommonJS module assigning `module.exports`
    CommonJs,
    /// ES module
    EsModule,
    /// Unrecognized format
    Other(String),
}

impl From<String> for OutputFormat {
    fn from(s: String) -> Self {
        match s.as_str() {
            "global" => Self::Global,
            "commonjs" => Self::CommonJs,
            "esmodule" => Self::EsModule,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::CommonJs => "commonjs",
            Self::EsModule => "esmodule",
            Self::Other(s) => s,
        })
    }
}

/// Target environment of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    /// Target runtime
    pub context: EnvContext,
    /// Output wrapping
    pub output_format: OutputFormat,
    /// Whether modules were concatenated into one scope
    pub scope_hoist: bool,
}

impl Environment {
    /// Create an environment
    pub fn new(context: impl Into<EnvContext>, output_format: impl Into<OutputFormat>) -> Self {
        Self {
            context: context.into(),
            output_format: output_format.into(),
            scope_hoist: false,
        }
    }

    /// Builder-style scope hoisting flag
    pub fn scope_hoisted(mut self, scope_hoist: bool) -> Self {
        self.scope_hoist = scope_hoist;
        self
    }
}

/// One output file of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Absolute path of the emitted file
    pub file_path: PathBuf,
    /// File kind
    #[serde(rename = "type", default)]
    pub bundle_type: BundleType,
    /// Target environment
    #[serde(default)]
    pub env: Environment,
    /// Public id of the bundle's main entry asset
    #[serde(default)]
    pub entry_public_id: Option<String>,
}

impl Bundle {
    /// Create a JavaScript bundle
    pub fn js(file_path: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            file_path: file_path.into(),
            bundle_type: BundleType::Js,
            env,
            entry_public_id: None,
        }
    }

    /// Create an HTML bundle
    pub fn html(file_path: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            bundle_type: BundleType::Html,
            ..Self::js(file_path, env)
        }
    }

    /// Builder-style entry public id
    pub fn with_entry(mut self, public_id: impl Into<String>) -> Self {
        self.entry_public_id = Some(public_id.into());
        self
    }
}

/// The bundles of one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleGraph {
    /// Every emitted bundle
    pub bundles: Vec<Bundle>,
}

impl BundleGraph {
    /// Create a graph
    pub fn new(bundles: Vec<Bundle>) -> Self {
        Self { bundles }
    }

    /// Parse a JSON manifest
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// All bundles in emission order
    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// Bundle emitted at `path`
    pub fn find_by_path(&self, path: &Path) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.file_path == path)
    }
}

/// Shape of the global environment a run builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// `window`/`document`/`fetch` world
    Browser,
    /// `module`/`exports`/`require` world
    Process,
    /// Both at once on one global object
    Hybrid,
}

impl ContextKind {
    /// Pick the context shape for a runtime
    pub fn for_context(context: &EnvContext) -> Result<Self> {
        match context {
            EnvContext::Browser | EnvContext::WebWorker | EnvContext::ServiceWorker => {
                Ok(Self::Browser)
            }
            EnvContext::Node | EnvContext::ElectronMain => Ok(Self::Process),
            EnvContext::ElectronRenderer => Ok(Self::Hybrid),
            EnvContext::Other(name) => Err(SandboxError::UnsupportedTarget(name.clone())),
        }
    }

    /// Whether browser globals are installed
    pub fn has_browser(self) -> bool {
        matches!(self, Self::Browser | Self::Hybrid)
    }

    /// Whether `module`/`require` are installed
    pub fn has_process(self) -> bool {
        matches!(self, Self::Process | Self::Hybrid)
    }
}

/// How the exported value is read back after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStrategy {
    /// `global` output with scope hoisting: the `output` global
    GlobalHoisted,
    /// `global` output without scope hoisting: call the module loader global
    GlobalLegacy,
    /// `commonjs` output: `module.exports`
    CommonJs,
}

impl ExportStrategy {
    /// Pick the extraction strategy for an environment
    pub fn for_env(env: &Environment) -> Result<Self> {
        match (&env.output_format, env.scope_hoist) {
            (OutputFormat::Global, true) => Ok(Self::GlobalHoisted),
            (OutputFormat::Global, false) => Ok(Self::GlobalLegacy),
            (OutputFormat::CommonJs, _) => Ok(Self::CommonJs),
            (other, _) => Err(SandboxError::UnsupportedOutputFormat(other.to_string())),
        }
    }
}
