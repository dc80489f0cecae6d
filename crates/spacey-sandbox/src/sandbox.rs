// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bundle executor

use boa_engine::JsValue;
use serde::{Deserialize, Serialize};
use spacey_resolve::FileSystem;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::bundle::{Bundle, BundleGraph, BundleType, ContextKind, ExportStrategy};
use crate::context::{ExecutionContext, RunState};
use crate::error::{Result, SandboxError};
use crate::host::HostModules;
use crate::html;

/// Global overrides copied onto every context of a run
pub type Globals = serde_json::Map<String, serde_json::Value>;

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Global read by hoisted `global` bundles
    pub output_global: String,
    /// Name prefix of the module loader global of non-hoisted bundles
    pub loader_prefix: String,
    /// How deep `require` may nest module contexts
    pub max_require_depth: usize,
    /// Builtins answered by the host
    #[serde(skip)]
    pub host_modules: HostModules,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            output_global: "output".to_string(),
            loader_prefix: "parcelRequire".to_string(),
            max_require_depth: 256,
            host_modules: HostModules::default(),
        }
    }
}

/// Per-run options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Extract the exported value after the run
    pub require: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { require: true }
    }
}

impl RunOptions {
    /// Return the context instead of an exported value
    pub fn context_only() -> Self {
        Self { require: false }
    }
}

/// The exported value of a run, with the context that produced it
#[derive(Debug)]
pub struct Exports {
    value: JsValue,
    context: ExecutionContext,
}

impl Exports {
    /// Exported value
    pub fn value(&self) -> &JsValue {
        &self.value
    }

    /// Context the value lives in
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Mutable access to the context
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Split into value and context
    pub fn into_parts(self) -> (JsValue, ExecutionContext) {
        (self.value, self.context)
    }

    /// Exported value as JSON
    pub fn to_json(&mut self) -> Result<serde_json::Value> {
        self.context.to_json(&self.value)
    }

    /// Call an exported function with JSON arguments and return its result as JSON
    pub fn call(&mut self, args: &[serde_json::Value]) -> Result<serde_json::Value> {
        let Some(function) = crate::context::callable(&self.value, self.context.engine())? else {
            return Err(SandboxError::Js("exported value is not a function".to_string()));
        };
        let args = args
            .iter()
            .map(|arg| JsValue::from_json(arg, self.context.engine()))
            .collect::<boa_engine::JsResult<Vec<_>>>()?;
        let result = function.call(&JsValue::undefined(), &args, self.context.engine())?;
        self.context.engine().run_jobs()?;
        self.context.to_json(&result)
    }

    /// Read a property of the exported value
    pub fn get(&mut self, key: &str) -> Result<JsValue> {
        let engine = self.context.engine();
        let object = self.value.to_object(engine)?;
        Ok(object.get(boa_engine::JsString::from(key), engine)?)
    }
}

/// What a run produced
#[derive(Debug)]
pub enum Outcome {
    /// The exported value
    Exports(Exports),
    /// The context, when extraction was not requested
    Context(ExecutionContext),
}

impl Outcome {
    /// Exported value, if extraction was requested
    pub fn exports(self) -> Option<Exports> {
        match self {
            Self::Exports(exports) => Some(exports),
            Self::Context(_) => None,
        }
    }

    /// Context of the run
    pub fn context(&self) -> &ExecutionContext {
        match self {
            Self::Exports(exports) => exports.context(),
            Self::Context(context) => context,
        }
    }

    /// Mutable context of the run
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        match self {
            Self::Exports(exports) => exports.context_mut(),
            Self::Context(context) => context,
        }
    }

    /// Consume into the context
    pub fn into_context(self) -> ExecutionContext {
        match self {
            Self::Exports(exports) => exports.context,
            Self::Context(context) => context,
        }
    }
}

/// Runs built bundles in simulated environments
#[derive(Debug, Clone)]
pub struct Sandbox {
    fs: Arc<dyn FileSystem>,
    config: SandboxConfig,
}

impl Sandbox {
    /// Create a sandbox over a file system with default configuration
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_config(fs, SandboxConfig::default())
    }

    /// Create a sandbox with explicit configuration
    pub fn with_config(fs: Arc<dyn FileSystem>, config: SandboxConfig) -> Self {
        Self { fs, config }
    }

    /// Configuration
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// File system bundles are read from
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Run one bundle of a graph
    ///
    /// An HTML bundle runs the local scripts it references, in document
    /// order, with itself as the parent. Any other bundle runs alone.
    pub async fn run_bundle(
        &self,
        graph: &BundleGraph,
        bundle: &Bundle,
        globals: &Globals,
        options: RunOptions,
    ) -> Result<Outcome> {
        if bundle.bundle_type != BundleType::Html {
            return self
                .run_bundles(std::slice::from_ref(bundle), bundle, globals, options)
                .await;
        }

        let html = self.read(&bundle.file_path).await?;
        let scripts = html::local_scripts(&bundle.file_path, &html)
            .into_iter()
            .map(|path| {
                graph
                    .find_by_path(&path)
                    .cloned()
                    .ok_or(SandboxError::BundleNotFound(path))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            html = %bundle.file_path.display(),
            scripts = scripts.len(),
            "running scripts referenced by HTML entry"
        );
        self.run_bundles(&scripts, bundle, globals, options).await
    }

    /// Run `bundles` in order inside one context shaped for `parent`
    pub async fn run_bundles(
        &self,
        bundles: &[Bundle],
        parent: &Bundle,
        globals: &Globals,
        options: RunOptions,
    ) -> Result<Outcome> {
        let kind = ContextKind::for_context(&parent.env.context)?;
        let strategy = if options.require {
            Some(ExportStrategy::for_env(&parent.env)?)
        } else {
            None
        };

        let state = Rc::new(RunState::new(self.fs.clone(), &self.config, globals.clone()));
        let mut context = ExecutionContext::prepare(kind, &parent.file_path, state)?;

        for bundle in bundles {
            let code = self.read(&bundle.file_path).await?;
            context.eval_file(&bundle.file_path, &code)?;
        }
        context.settle().await?;
        info!(
            parent = %parent.file_path.display(),
            bundles = bundles.len(),
            ?kind,
            "bundles settled"
        );

        let Some(strategy) = strategy else {
            return Ok(Outcome::Context(context));
        };
        let entry = parent.entry_public_id.as_deref().or_else(|| {
            bundles
                .iter()
                .rev()
                .find_map(|bundle| bundle.entry_public_id.as_deref())
        });
        let value = context.extract(strategy, &self.config, entry)?;
        Ok(Outcome::Exports(Exports { value, context }))
    }

    async fn read(&self, path: &Path) -> Result<String> {
        let bytes = self
            .fs
            .read_file(path)
            .await
            .map_err(|source| SandboxError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
