// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Browser globals: `document`, `location`, `fetch`, `atob`/`btoa`

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use boa_engine::{Context, JsArgs, JsNativeError, JsResult, JsString, JsValue, Source, js_string};
use tracing::debug;

use super::{Shim, js_error, native, native_fn, optional_string_arg, queue_read, set, string_arg};
use crate::html::url_to_path;
use crate::pending::{PendingLoad, ReadEncoding};

/// `atob` accepts input with or without padding
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Called with `(global, scheduleScript, readFile)`
const PRELUDE: &str = r#"(function (global, scheduleScript, readFile) {
  function toBuffer(binary) {
    var bytes = new Uint8Array(binary.length);
    for (var i = 0; i < binary.length; i++) bytes[i] = binary.charCodeAt(i);
    return bytes.buffer;
  }

  function node(tag) {
    var el = {
      tag: tag,
      tagName: String(tag).toUpperCase(),
      children: [],
      setAttribute: function (name, value) { this[name] = value; },
      getAttribute: function (name) { return this[name]; },
      hasAttribute: function (name) { return this[name] !== undefined; },
      remove: function () {},
      appendChild: function (child) {
        this.children.push(child);
        var childTag = child && (child.tag || child.tagName);
        if (childTag && String(childTag).toLowerCase() === 'script') {
          scheduleScript(child);
        } else if (child && typeof child.onload === 'function') {
          child.onload();
        }
        return child;
      }
    };
    el.insertBefore = el.appendChild;
    return el;
  }

  var head = node('head');
  var body = node('body');
  var html = node('html');
  html.children.push(head, body);

  global.document = {
    head: head,
    body: body,
    documentElement: html,
    currentScript: {
      src: 'http://localhost/script.js',
      hasAttribute: function () { return true; }
    },
    createElement: node,
    getElementsByTagName: function (tag) {
      switch (String(tag).toLowerCase()) {
        case 'head': return [head];
        case 'body': return [body];
        case 'html': return [html];
        default: return [];
      }
    },
    querySelector: function () { return null; },
    addEventListener: function () {}
  };

  global.location = {
    protocol: 'http:',
    hostname: 'localhost',
    host: 'localhost',
    origin: 'http://localhost',
    href: 'http://localhost/',
    pathname: '/'
  };

  global.fetch = function (url) {
    url = String(url);
    return Promise.resolve({
      url: url,
      ok: true,
      status: 200,
      text: function () { return readFile(url, 'utf8'); },
      json: function () { return readFile(url, 'utf8').then(JSON.parse); },
      arrayBuffer: function () { return readFile(url).then(toBuffer); }
    });
  };
})"#;

pub(super) fn install(context: &mut Context, shim: &Shim) -> JsResult<()> {
    let global = context.global_object();
    let schedule = native(context, "scheduleScript", 1, shim.clone(), schedule_script);
    let read = native(context, "readFile", 2, shim.clone(), read_url);

    let prelude = context
        .eval(Source::from_bytes(PRELUDE))?
        .to_object(context)?;
    prelude.call(
        &JsValue::undefined(),
        &[global.clone().into(), schedule.into(), read.into()],
        context,
    )?;

    let atob = native_fn(context, "atob", 1, atob);
    let btoa = native_fn(context, "btoa", 1, btoa);
    set(&global, "atob", atob, context)?;
    set(&global, "btoa", btoa, context)?;
    Ok(())
}

fn schedule_script(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let element = args.get_or_undefined(0).to_object(context)?;
    let src = element.get(js_string!("src"), context)?;
    if src.is_null_or_undefined() {
        return Err(JsNativeError::typ()
            .with_message("script element has no src")
            .into());
    }
    let src = src.to_string(context)?.to_std_string_escaped();
    let path = url_to_path(shim.dir(), &src);
    debug!(%src, path = %path.display(), "scheduled script");

    shim.state
        .pending
        .borrow_mut()
        .push(PendingLoad::Script { path, element });
    Ok(JsValue::undefined())
}

fn read_url(_this: &JsValue, args: &[JsValue], shim: &Shim, context: &mut Context) -> JsResult<JsValue> {
    let url = string_arg(args, 0, context)?;
    let encoding = optional_string_arg(args, 1, context)?;
    let path = url_to_path(shim.dir(), &url);
    Ok(queue_read(
        path,
        ReadEncoding::from_name(encoding.as_deref()),
        shim,
        context,
    ))
}

fn atob(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input: String = string_arg(args, 0, context)?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = FORGIVING.decode(input.as_bytes()).map_err(|_| {
        js_error("InvalidCharacterError: The string to be decoded is not correctly encoded.")
    })?;
    Ok(JsString::from(ReadEncoding::Binary.decode(&bytes)).into())
}

fn btoa(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg(args, 0, context)?;
    let bytes = input
        .chars()
        .map(|c| u8::try_from(u32::from(c)))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| {
            js_error("InvalidCharacterError: The string to be encoded contains characters outside of the Latin1 range.")
        })?;
    Ok(JsString::from(STANDARD.encode(bytes)).into())
}
