// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution contexts
//!
//! An [`ExecutionContext`] owns one engine [`Context`] whose global object has
//! been shaped for a runtime: browser globals, process globals, or both. Every
//! context built for one run shares a [`RunState`] holding the pending task
//! list, the module cache and the captured console.

mod browser;
mod console;
mod node;

pub use console::{ConsoleLevel, ConsoleMessage};

use boa_engine::object::FunctionObjectBuilder;
use boa_engine::native_function::NativeFunctionPointer;
use boa_engine::object::builtins::{JsFunction, JsPromise};
use boa_engine::{
    Context, JsArgs, JsError, JsNativeError, JsObject, JsResult, JsString, JsValue,
    NativeFunction, Source, js_string,
};
use boa_gc::{Finalize, Trace};
use spacey_resolve::{FileSystem, Resolver, ResolverOptions, SourceFieldPolicy};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::bundle::{ContextKind, ExportStrategy};
use crate::error::{Result, SandboxError};
use crate::host::HostModules;
use crate::pending::{PendingLoad, PendingQueue, ReadEncoding};
use crate::sandbox::{Globals, SandboxConfig};

/// State shared by every context of one run
pub(crate) struct RunState {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) resolver: Resolver,
    pub(crate) globals: Globals,
    pub(crate) host_modules: HostModules,
    pub(crate) max_require_depth: usize,
    pub(crate) pending: RefCell<PendingQueue>,
    /// `module` objects by file path
    pub(crate) modules: RefCell<HashMap<PathBuf, JsObject>>,
    pub(crate) host_cache: RefCell<HashMap<String, JsValue>>,
    pub(crate) console: RefCell<Vec<ConsoleMessage>>,
    pub(crate) depth: Cell<usize>,
}

impl RunState {
    pub(crate) fn new(fs: Arc<dyn FileSystem>, config: &SandboxConfig, globals: Globals) -> Self {
        // `require` only loads what the engine can evaluate
        let options = ResolverOptions::default()
            .with_extensions([".js", ".json"])
            .with_source_policy(SourceFieldPolicy::disabled());

        Self {
            resolver: Resolver::with_options(fs.clone(), options),
            fs,
            globals,
            host_modules: config.host_modules.clone(),
            max_require_depth: config.max_require_depth,
            pending: RefCell::default(),
            modules: RefCell::default(),
            host_cache: RefCell::default(),
            console: RefCell::default(),
            depth: Cell::new(0),
        }
    }
}

/// Captures of a native shim: the run and the file whose globals it serves
#[derive(Clone, Trace, Finalize)]
pub(crate) struct Shim {
    #[unsafe_ignore_trace]
    pub(crate) state: Rc<RunState>,
    #[unsafe_ignore_trace]
    pub(crate) file_path: PathBuf,
}

impl Shim {
    pub(crate) fn new(state: Rc<RunState>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            state,
            file_path: file_path.into(),
        }
    }

    /// Directory relative paths are taken from
    pub(crate) fn dir(&self) -> &Path {
        self.file_path.parent().unwrap_or(Path::new("/"))
    }
}

/// Signature of every native shim body
pub(crate) type ShimFn<T> = fn(&JsValue, &[JsValue], &T, &mut Context) -> JsResult<JsValue>;

/// Build a named native function over `captures`
pub(crate) fn native<T: Trace + 'static>(
    context: &mut Context,
    name: &str,
    length: usize,
    captures: T,
    body: ShimFn<T>,
) -> JsFunction {
    FunctionObjectBuilder::new(
        context.realm(),
        NativeFunction::from_copy_closure_with_captures(body, captures),
    )
    .name(JsString::from(name))
    .length(length)
    .build()
}

/// Build a named native function without captures
pub(crate) fn native_fn(
    context: &mut Context,
    name: &str,
    length: usize,
    body: NativeFunctionPointer,
) -> JsFunction {
    FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(body))
        .name(JsString::from(name))
        .length(length)
        .build()
}

/// Queue an asynchronous read of `path` and return the promise it settles
pub(crate) fn queue_read(
    path: PathBuf,
    encoding: ReadEncoding,
    shim: &Shim,
    context: &mut Context,
) -> JsValue {
    let (promise, resolvers) = JsPromise::new_pending(context);
    shim.state.pending.borrow_mut().push(PendingLoad::Read {
        path,
        encoding,
        resolvers,
    });
    promise.into()
}

/// Set a writable property
pub(crate) fn set(
    object: &JsObject,
    name: &str,
    value: impl Into<JsValue>,
    context: &mut Context,
) -> JsResult<()> {
    object.set(JsString::from(name), value, true, context)?;
    Ok(())
}

/// Argument `index` converted to a Rust string
pub(crate) fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(context)?
        .to_std_string_escaped())
}

/// Argument `index` as a string, or `None` when undefined or null
pub(crate) fn optional_string_arg(
    args: &[JsValue],
    index: usize,
    context: &mut Context,
) -> JsResult<Option<String>> {
    let value = args.get_or_undefined(index);
    if value.is_null_or_undefined() {
        return Ok(None);
    }
    Ok(Some(value.to_string(context)?.to_std_string_escaped()))
}

/// The value as a function object, if it is callable
pub(crate) fn callable(value: &JsValue, context: &mut Context) -> JsResult<Option<JsObject>> {
    if value.is_callable() {
        Ok(Some(value.to_object(context)?))
    } else {
        Ok(None)
    }
}

/// A plain `Error` to throw into script
pub(crate) fn js_error(message: impl Into<String>) -> JsError {
    JsNativeError::error().with_message(message.into()).into()
}

/// Install the globals every context shape has: `console` and timers
fn install_common(context: &mut Context, shim: &Shim) -> JsResult<()> {
    console::install(context, shim)?;

    let global = context.global_object();
    let set_timeout = native(context, "setTimeout", 2, shim.clone(), set_timeout);
    let clear_timeout = native(context, "clearTimeout", 1, shim.clone(), clear_timeout);
    set(&global, "setTimeout", set_timeout, context)?;
    set(&global, "clearTimeout", clear_timeout, context)?;
    Ok(())
}

/// Copy caller-supplied overrides onto the global object
fn apply_globals(context: &mut Context, globals: &Globals) -> JsResult<()> {
    let global = context.global_object();
    for (name, value) in globals {
        let value = JsValue::from_json(value, context)?;
        set(&global, name, value, context)?;
    }
    Ok(())
}

/// Shape the current realm as a module scope and return its `module` object
pub(crate) fn shape_module_realm(context: &mut Context, shim: &Shim) -> JsResult<JsObject> {
    install_common(context, shim)?;
    let module = node::install(context, shim)?;
    apply_globals(context, &shim.state.globals)?;

    let global = context.global_object();
    set(&global, "global", global.clone(), context)?;
    Ok(module)
}

fn set_timeout(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    schedule_timer(args, 2, shim, context)
}

pub(crate) fn set_immediate(
    _this: &JsValue,
    args: &[JsValue],
    shim: &Shim,
    context: &mut Context,
) -> JsResult<JsValue> {
    schedule_timer(args, 1, shim, context)
}

fn schedule_timer(args: &[JsValue], rest: usize, shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let Some(callback) = callable(args.get_or_undefined(0), context)? else {
        return Err(JsNativeError::typ()
            .with_message("The \"callback\" argument must be of type function")
            .into());
    };
    let extra = args.get(rest..).unwrap_or_default().to_vec();
    let id = shim.state.pending.borrow_mut().push_timer(callback, extra);
    Ok(JsValue::from(id))
}

fn clear_timeout(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let id = args.get_or_undefined(0);
    if !id.is_null_or_undefined() {
        let id = id.to_u32(context)?;
        shim.state.pending.borrow_mut().cancel_timer(id);
    }
    Ok(JsValue::undefined())
}

/// One engine context shaped for a runtime
pub struct ExecutionContext {
    context: Context,
    kind: ContextKind,
    file_path: PathBuf,
    state: Rc<RunState>,
}

impl ExecutionContext {
    /// Build the global environment for a bundle at `file_path`
    pub(crate) fn prepare(kind: ContextKind, file_path: &Path, state: Rc<RunState>) -> Result<Self> {
        let mut context = Context::default();
        let shim = Shim::new(state.clone(), file_path);

        install_common(&mut context, &shim)?;
        if kind.has_browser() {
            browser::install(&mut context, &shim)?;
        }
        if kind.has_process() {
            let module = node::install(&mut context, &shim)?;
            state
                .modules
                .borrow_mut()
                .insert(file_path.to_path_buf(), module);
        }
        apply_globals(&mut context, &state.globals)?;

        let global = context.global_object();
        if kind.has_browser() {
            set(&global, "window", global.clone(), &mut context)?;
            set(&global, "self", global.clone(), &mut context)?;
        }
        set(&global, "global", global.clone(), &mut context)?;

        debug!(?kind, path = %file_path.display(), "prepared execution context");
        Ok(Self {
            context,
            kind,
            file_path: file_path.to_path_buf(),
            state,
        })
    }

    /// Shape of this context
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// File the context was built for
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Console output captured so far, across every realm of the run
    pub fn console(&self) -> Vec<ConsoleMessage> {
        self.state.console.borrow().clone()
    }

    /// Number of deferred tasks still queued
    pub fn pending(&self) -> usize {
        self.state.pending.borrow().len()
    }

    /// Files loaded through `require`, including the top-level module
    pub fn required_modules(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.state.modules.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// `module.exports` of a file loaded in this run
    pub fn module_exports(&mut self, path: &Path) -> Result<Option<JsValue>> {
        let module = self.state.modules.borrow().get(path).cloned();
        match module {
            Some(module) => Ok(Some(module.get(js_string!("exports"), &mut self.context)?)),
            None => Ok(None),
        }
    }

    /// The underlying engine context
    pub fn engine(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Evaluate code in this context and run queued microtasks
    pub fn eval(&mut self, code: &str) -> Result<JsValue> {
        let value = self.context.eval(Source::from_bytes(code.as_bytes()))?;
        self.context.run_jobs()?;
        Ok(value)
    }

    /// Read a global property
    pub fn global(&mut self, name: &str) -> Result<JsValue> {
        let global = self.context.global_object();
        Ok(global.get(JsString::from(name), &mut self.context)?)
    }

    /// Convert a value to JSON with the engine's `JSON.stringify`
    ///
    /// Values `JSON.stringify` maps to `undefined` become `null`.
    pub fn to_json(&mut self, value: &JsValue) -> Result<serde_json::Value> {
        let global = self.context.global_object();
        let json = global
            .get(js_string!("JSON"), &mut self.context)?
            .to_object(&mut self.context)?;
        let stringify = json
            .get(js_string!("stringify"), &mut self.context)?
            .to_object(&mut self.context)?;
        let text = stringify.call(&JsValue::from(json), &[value.clone()], &mut self.context)?;
        if text.is_undefined() {
            return Ok(serde_json::Value::Null);
        }
        let text = text.to_string(&mut self.context)?.to_std_string_escaped();
        Ok(serde_json::from_str(&text)?)
    }

    /// Evaluate a bundle's source, attributing failures to its path
    pub(crate) fn eval_file(&mut self, path: &Path, code: &str) -> Result<()> {
        debug!(path = %path.display(), "evaluating");
        let source = Source::from_bytes(code.as_bytes()).with_path(path);
        self.context
            .eval(source)
            .map_err(|err| SandboxError::script(path, err))?;
        self.context.run_jobs()?;
        Ok(())
    }

    /// Drain deferred work until nothing is queued
    ///
    /// Microtasks run before every task, so promise continuations queue their
    /// own loads before the queue is checked for emptiness.
    pub(crate) async fn settle(&mut self) -> Result<()> {
        loop {
            self.context.run_jobs()?;
            let task = self.state.pending.borrow_mut().pop();
            let Some(task) = task else {
                return Ok(());
            };
            trace!(?task, "running deferred task");

            match task {
                PendingLoad::Script { path, element } => {
                    let bytes = self.load(&path).await?;
                    self.eval_file(&path, &String::from_utf8_lossy(&bytes))?;
                    let onload = element.get(js_string!("onload"), &mut self.context)?;
                    if let Some(onload) = callable(&onload, &mut self.context)? {
                        onload
                            .call(&JsValue::from(element), &[], &mut self.context)
                            .map_err(|err| SandboxError::script(&path, err))?;
                    }
                }
                PendingLoad::Read {
                    path,
                    encoding,
                    resolvers,
                } => {
                    let bytes = self.load(&path).await?;
                    let text = JsString::from(encoding.decode(&bytes));
                    resolvers
                        .resolve
                        .call(&JsValue::undefined(), &[text.into()], &mut self.context)?;
                }
                PendingLoad::Timer { callback, args, .. } => {
                    callback.call(&JsValue::undefined(), &args, &mut self.context)?;
                }
            }
        }
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        self.state
            .fs
            .read_file(path)
            .await
            .map_err(|source| SandboxError::Load {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read the exported value back out of the context
    pub(crate) fn extract(
        &mut self,
        strategy: ExportStrategy,
        config: &SandboxConfig,
        entry: Option<&str>,
    ) -> Result<JsValue> {
        let global = self.context.global_object();
        match strategy {
            ExportStrategy::GlobalHoisted => {
                Ok(global.get(JsString::from(config.output_global.as_str()), &mut self.context)?)
            }
            ExportStrategy::GlobalLegacy => {
                let Some(name) = self.find_global(&config.loader_prefix)? else {
                    return Ok(JsValue::undefined());
                };
                let loader = global.get(JsString::from(name.as_str()), &mut self.context)?;
                let Some(loader) = callable(&loader, &mut self.context)? else {
                    return Err(SandboxError::invariant(format!(
                        "global '{name}' is not a function"
                    )));
                };
                let entry = entry.ok_or_else(|| {
                    SandboxError::invariant("no entry public id to pass to the module loader")
                })?;
                Ok(loader.call(
                    &JsValue::undefined(),
                    &[JsString::from(entry).into()],
                    &mut self.context,
                )?)
            }
            ExportStrategy::CommonJs => {
                let module = global.get(js_string!("module"), &mut self.context)?;
                if !module.is_object() {
                    return Err(SandboxError::invariant("expected module to be an object"));
                }
                Ok(module
                    .to_object(&mut self.context)?
                    .get(js_string!("exports"), &mut self.context)?)
            }
        }
    }

    /// First enumerable global whose name starts with `prefix`
    fn find_global(&mut self, prefix: &str) -> Result<Option<String>> {
        const FIND: &str = "(function (prefix) {\n\
            for (var key in globalThis) {\n\
                if (key.indexOf(prefix) === 0) return key;\n\
            }\n\
        })";
        let finder = self
            .context
            .eval(Source::from_bytes(FIND))?
            .to_object(&mut self.context)?;
        let key = finder.call(
            &JsValue::undefined(),
            &[JsString::from(prefix).into()],
            &mut self.context,
        )?;
        if key.is_undefined() {
            return Ok(None);
        }
        Ok(Some(key.to_string(&mut self.context)?.to_std_string_escaped()))
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("kind", &self.kind)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        // Engine objects held by the run refer back to it through native
        // captures; release them so the run state can be freed.
        self.state.pending.borrow_mut().clear();
        self.state.modules.borrow_mut().clear();
        self.state.host_cache.borrow_mut().clear();
    }
}
