// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Native `path` module (POSIX flavour only)

use boa_engine::{Context, JsObject, JsResult, JsString, JsValue};
use spacey_resolve::path;

use crate::context::{native_fn, optional_string_arg, set, string_arg};

/// POSIX `path`
pub fn path_module(context: &mut Context) -> JsResult<JsValue> {
    let module = JsObject::with_object_proto(context.intrinsics());
    let methods: [(&str, usize, boa_engine::native_function::NativeFunctionPointer); 7] = [
        ("join", 2, join),
        ("resolve", 2, resolve),
        ("normalize", 1, normalize),
        ("dirname", 1, dirname),
        ("basename", 2, basename),
        ("extname", 1, extname),
        ("isAbsolute", 1, is_absolute),
    ];
    for (name, length, body) in methods {
        let function = native_fn(context, name, length, body);
        set(&module, name, function, context)?;
    }
    set(&module, "sep", JsString::from("/"), context)?;
    set(&module, "delimiter", JsString::from(":"), context)?;
    set(&module, "posix", module.clone(), context)?;
    Ok(module.into())
}

fn strings(args: &[JsValue], context: &mut Context) -> JsResult<Vec<String>> {
    (0..args.len()).map(|i| string_arg(args, i, context)).collect()
}

fn string_value(s: String) -> JsResult<JsValue> {
    Ok(JsString::from(s).into())
}

fn join(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let parts = strings(args, context)?;
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    string_value(path::join(&parts))
}

fn resolve(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let parts = strings(args, context)?;
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    string_value(path::resolve("/", &parts))
}

fn normalize(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    string_value(path::normalize(&string_arg(args, 0, context)?))
}

fn dirname(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    string_value(path::dirname(&string_arg(args, 0, context)?))
}

fn basename(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let file = string_arg(args, 0, context)?;
    let ext = optional_string_arg(args, 1, context)?;
    string_value(path::basename(&file, ext.as_deref()))
}

fn extname(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    string_value(path::extname(&string_arg(args, 0, context)?))
}

fn is_absolute(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    Ok(path::is_absolute(&string_arg(args, 0, context)?).into())
}

#[cfg(test)]
mod tests {
    use super::super::tests::eval_with;
    use super::*;

    #[test]
    fn test_path_module() {
        assert_eq!(
            eval_with(
                path_module,
                "path",
                "[path.join('/a', 'b', '../c.js'), path.dirname('/a/b/c.js'), \
                 path.basename('/a/b/c.js', '.js'), path.extname('x.json'), \
                 path.resolve('a', './b'), path.isAbsolute('/x'), \
                 path.posix === path].join('|')",
            ),
            "/a/c.js|/a/b|c|.json|/a/b|true|true"
        );
    }
}
