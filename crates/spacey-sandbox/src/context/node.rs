// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Process globals and `require`
//!
//! Every file loaded through `require` is evaluated in a fresh realm of the
//! same engine context, shaped like the top-level module scope. The module
//! object is cached before its source runs, so a cycle sees the partially
//! populated `exports` of the module that started it.

use boa_engine::{
    Context, JsNativeError, JsObject, JsResult, JsString, JsValue, Source, js_string,
};
use spacey_resolve::{BuiltinSet, Resolved};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{
    Shim, js_error, native, optional_string_arg, queue_read, set, set_immediate,
    shape_module_realm, string_arg,
};
use crate::host::platform;
use crate::pending::ReadEncoding;

/// Called with `(readFileSync, readFile, existsSync)`
const FS_SHIM: &str = r#"(function (readFileSync, readFile, existsSync) {
  function toBytes(binary) {
    var bytes = new Uint8Array(binary.length);
    for (var i = 0; i < binary.length; i++) bytes[i] = binary.charCodeAt(i);
    return bytes;
  }
  function encodingOf(options) {
    return typeof options === 'string' ? options : options && options.encoding;
  }
  function decode(data, encoding) {
    return encoding ? data : toBytes(data);
  }

  return {
    readFileSync: function (file, options) {
      var encoding = encodingOf(options);
      return decode(readFileSync(String(file), encoding), encoding);
    },
    readFile: function (file, options, callback) {
      if (typeof options === 'function') {
        callback = options;
        options = undefined;
      }
      var encoding = encodingOf(options);
      readFile(String(file), encoding).then(function (data) {
        callback(null, decode(data, encoding));
      }, callback);
    },
    existsSync: function (file) {
      return existsSync(String(file));
    },
    promises: {
      readFile: function (file, options) {
        var encoding = encodingOf(options);
        return readFile(String(file), encoding).then(function (data) {
          return decode(data, encoding);
        });
      }
    }
  };
})"#;

/// Install `module`, `exports`, `require`, `process` and friends on the
/// current realm's global object and return the `module` object
pub(super) fn install(context: &mut Context, shim: &Shim) -> JsResult<JsObject> {
    let global = context.global_object();
    let filename = JsString::from(&*shim.file_path.to_string_lossy());
    let dirname = JsString::from(&*shim.dir().to_string_lossy());

    let require = native(context, "require", 1, shim.clone(), require);
    let resolve = native(context, "resolve", 1, shim.clone(), require_resolve);
    set(&require, "resolve", resolve, context)?;

    let exports = JsObject::with_object_proto(context.intrinsics());
    let module = JsObject::with_object_proto(context.intrinsics());
    set(&module, "exports", exports.clone(), context)?;
    set(&module, "require", require.clone(), context)?;
    set(&module, "id", filename.clone(), context)?;
    set(&module, "filename", filename.clone(), context)?;

    let process = process_object(context, shim)?;
    let set_immediate = native(context, "setImmediate", 1, shim.clone(), set_immediate);

    set(&global, "module", module.clone(), context)?;
    set(&global, "exports", exports, context)?;
    set(&global, "require", require, context)?;
    set(&global, "__filename", filename, context)?;
    set(&global, "__dirname", dirname, context)?;
    set(&global, "process", process, context)?;
    set(&global, "setImmediate", set_immediate, context)?;
    Ok(module)
}

fn process_object(context: &mut Context, shim: &Shim) -> JsResult<JsObject> {
    let process = JsObject::with_object_proto(context.intrinsics());
    let env = JsObject::with_object_proto(context.intrinsics());
    let argv = JsValue::from_json(
        &serde_json::json!(["spacey", shim.file_path.to_string_lossy()]),
        context,
    )?;
    let cwd = native(context, "cwd", 0, shim.clone(), cwd);
    let next_tick = native(context, "nextTick", 1, shim.clone(), set_immediate);

    set(&process, "env", env, context)?;
    set(&process, "argv", argv, context)?;
    set(&process, "platform", js_string!(platform()), context)?;
    set(&process, "browser", false, context)?;
    set(&process, "cwd", cwd, context)?;
    set(&process, "nextTick", next_tick, context)?;
    Ok(process)
}

fn cwd(_this: &JsValue, _args: &[JsValue], shim: &Shim, _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsString::from(&*shim.dir().to_string_lossy()).into())
}

fn require(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let specifier = string_arg(args, 0, context)?;
    let resolved = shim
        .state
        .resolver
        .resolve(&specifier, &shim.file_path)
        .map_err(|err| js_error(err.to_string()))?;

    match &resolved.resolved {
        Resolved::Builtin(name) => load_builtin(BuiltinSet::canonical_name(name), shim, context),
        Resolved::File(path) => load_module(path, shim, context),
    }
}

fn require_resolve(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let specifier = string_arg(args, 0, context)?;
    let resolved = shim
        .state
        .resolver
        .resolve(&specifier, &shim.file_path)
        .map_err(|err| js_error(err.to_string()))?;

    Ok(match &resolved.resolved {
        Resolved::Builtin(name) => JsString::from(name.as_str()).into(),
        Resolved::File(path) => JsString::from(&*path.to_string_lossy()).into(),
    })
}

fn load_builtin(name: &str, shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    match name {
        "fs" => return fs_module(shim, context),
        "fs/promises" => {
            return fs_module(shim, context)?
                .to_object(context)?
                .get(js_string!("promises"), context);
        }
        _ => {}
    }

    let cached = shim.state.host_cache.borrow().get(name).cloned();
    if let Some(module) = cached {
        return Ok(module);
    }

    let Some(factory) = shim.state.host_modules.get(name) else {
        warn!(name, from = %shim.file_path.display(), "unsupported builtin module");
        return Err(js_error(format!("Cannot find module '{name}'")));
    };
    let module = factory(context)?;
    shim.state
        .host_cache
        .borrow_mut()
        .insert(name.to_string(), module.clone());
    Ok(module)
}

fn load_module(path: &Path, shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let state = &shim.state;
    let cached = state.modules.borrow().get(path).cloned();
    if let Some(module) = cached {
        return module.get(js_string!("exports"), context);
    }

    let depth = state.depth.get();
    if depth >= state.max_require_depth {
        return Err(JsNativeError::range()
            .with_message(format!(
                "Maximum require depth of {} exceeded loading '{}'",
                state.max_require_depth,
                path.display()
            ))
            .into());
    }

    let source = state
        .fs
        .read_to_string_sync(path)
        .map_err(|err| js_error(format!("Cannot read module '{}': {err}", path.display())))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        let json: serde_json::Value = serde_json::from_str(&source).map_err(|err| {
            JsNativeError::syntax().with_message(format!("{}: {err}", path.display()))
        })?;
        let exports = JsValue::from_json(&json, context)?;
        let module = JsObject::with_object_proto(context.intrinsics());
        set(&module, "exports", exports.clone(), context)?;
        state.modules.borrow_mut().insert(path.to_path_buf(), module);
        return Ok(exports);
    }

    debug!(path = %path.display(), depth, "building module context");
    let realm = context.create_realm()?;
    let previous = context.enter_realm(realm);
    state.depth.set(depth + 1);

    let result = evaluate_module(path, &source, shim, context);

    state.depth.set(depth);
    context.enter_realm(previous);
    if result.is_err() {
        state.modules.borrow_mut().remove(path);
    }
    result
}

fn evaluate_module(path: &Path, source: &str, shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let child = Shim::new(shim.state.clone(), path);
    let module = shape_module_realm(context, &child)?;
    shim.state
        .modules
        .borrow_mut()
        .insert(path.to_path_buf(), module.clone());

    // Same line, so reported line numbers match the file
    let code = format!("\"use strict\";{source}");
    context.eval(Source::from_bytes(code.as_bytes()).with_path(path))?;
    module.get(js_string!("exports"), context)
}

fn fs_module(shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let read_sync = native(context, "readFileSync", 2, shim.clone(), fs_read_sync);
    let read = native(context, "readFile", 2, shim.clone(), fs_read);
    let exists = native(context, "existsSync", 1, shim.clone(), fs_exists);

    let factory = context
        .eval(Source::from_bytes(FS_SHIM))?
        .to_object(context)?;
    factory.call(
        &JsValue::undefined(),
        &[read_sync.into(), read.into(), exists.into()],
        context,
    )
}

/// Absolute paths are used as-is; relative ones start at the module's directory
fn fs_path(shim: &Shim, file: &str) -> PathBuf {
    spacey_resolve::path::normalize_path(&shim.dir().join(file))
}

fn fs_read_sync(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let path = fs_path(shim, &string_arg(args, 0, context)?);
    let encoding = ReadEncoding::from_name(optional_string_arg(args, 1, context)?.as_deref());
    let bytes = shim
        .state
        .fs
        .read_file_sync(&path)
        .map_err(|err| open_error(&err, &path))?;
    Ok(JsString::from(encoding.decode(&bytes)).into())
}

fn open_error(err: &std::io::Error, path: &Path) -> boa_engine::JsError {
    if err.kind() == std::io::ErrorKind::NotFound {
        js_error(format!(
            "ENOENT: no such file or directory, open '{}'",
            path.display()
        ))
    } else {
        js_error(format!("{err}, open '{}'", path.display()))
    }
}

fn fs_read(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let path = fs_path(shim, &string_arg(args, 0, context)?);
    let encoding = ReadEncoding::from_name(optional_string_arg(args, 1, context)?.as_deref());
    Ok(queue_read(path, encoding, shim, context))
}

fn fs_exists(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let path = fs_path(shim, &string_arg(args, 0, context)?);
    Ok(shim.state.fs.stat_sync(&path).is_ok().into())
}
