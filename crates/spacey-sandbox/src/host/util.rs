// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `util` and `util/types`

use boa_engine::{Context, JsResult, JsValue, js_string};

use super::js_module;

const UTIL: &str = r#"(function () {
  var toString = Object.prototype.toString;

  function tag(value) {
    return toString.call(value).slice(8, -1);
  }

  var types = {
    isDate: function (v) { return tag(v) === 'Date'; },
    isRegExp: function (v) { return tag(v) === 'RegExp'; },
    isMap: function (v) { return tag(v) === 'Map'; },
    isSet: function (v) { return tag(v) === 'Set'; },
    isPromise: function (v) { return tag(v) === 'Promise'; },
    isNativeError: function (v) { return v instanceof Error; },
    isTypedArray: function (v) { return ArrayBuffer.isView(v) && !(v instanceof DataView); },
    isUint8Array: function (v) { return tag(v) === 'Uint8Array'; },
    isArrayBuffer: function (v) { return tag(v) === 'ArrayBuffer'; },
    isAsyncFunction: function (v) { return tag(v) === 'AsyncFunction'; },
    isGeneratorFunction: function (v) { return tag(v) === 'GeneratorFunction'; }
  };

  function inspect(value, depth, seen) {
    depth = depth === undefined ? 2 : depth;
    seen = seen || [];
    switch (typeof value) {
      case 'string': return seen.length ? "'" + value + "'" : value;
      case 'function': return '[Function: ' + (value.name || '(anonymous)') + ']';
      case 'symbol': return value.toString();
      case 'bigint': return value + 'n';
      case 'undefined': return 'undefined';
      case 'object': break;
      default: return String(value);
    }
    if (value === null) return 'null';
    if (seen.indexOf(value) !== -1) return '[Circular]';
    if (value instanceof Error) return value.stack || String(value);
    if (types.isDate(value)) return value.toISOString();
    if (types.isRegExp(value)) return String(value);
    if (depth < 0) return Array.isArray(value) ? '[Array]' : '[Object]';
    var next = seen.concat([value]);
    if (Array.isArray(value)) {
      if (value.length === 0) return '[]';
      return '[ ' + value.map(function (item) {
        return inspect(item, depth - 1, next);
      }).join(', ') + ' ]';
    }
    var keys = Object.keys(value);
    if (keys.length === 0) return '{}';
    return '{ ' + keys.map(function (key) {
      return key + ': ' + inspect(value[key], depth - 1, next);
    }).join(', ') + ' }';
  }

  function format(f) {
    var args = Array.prototype.slice.call(arguments, 1);
    if (typeof f !== 'string') {
      return [f].concat(args).map(function (a) { return inspect(a); }).join(' ');
    }
    var i = 0;
    var out = f.replace(/%[sdifjoO%]/g, function (token) {
      if (token === '%%') return '%';
      if (i >= args.length) return token;
      var arg = args[i++];
      switch (token) {
        case '%s': return typeof arg === 'string' ? arg : inspect(arg);
        case '%d': return String(Number(arg));
        case '%i': return String(parseInt(arg, 10));
        case '%f': return String(parseFloat(arg));
        case '%j':
          try { return JSON.stringify(arg); } catch (e) { return '[Circular]'; }
        default: return inspect(arg);
      }
    });
    for (; i < args.length; i++) {
      out += ' ' + (typeof args[i] === 'string' ? args[i] : inspect(args[i]));
    }
    return out;
  }

  function isDeepStrictEqual(a, b) {
    if (Object.is(a, b)) return true;
    if (typeof a !== 'object' || typeof b !== 'object' || a === null || b === null) return false;
    if (Object.getPrototypeOf(a) !== Object.getPrototypeOf(b)) return false;
    if (types.isDate(a)) return a.getTime() === b.getTime();
    var keysA = Object.keys(a);
    var keysB = Object.keys(b);
    if (keysA.length !== keysB.length) return false;
    return keysA.every(function (key) {
      return Object.prototype.hasOwnProperty.call(b, key) && isDeepStrictEqual(a[key], b[key]);
    });
  }

  function promisify(original) {
    if (typeof original !== 'function') {
      throw new TypeError('The "original" argument must be of type function');
    }
    return function () {
      var self = this;
      var args = Array.prototype.slice.call(arguments);
      return new Promise(function (resolve, reject) {
        args.push(function (err, value) {
          if (err) reject(err); else resolve(value);
        });
        original.apply(self, args);
      });
    };
  }

  function callbackify(original) {
    return function () {
      var args = Array.prototype.slice.call(arguments);
      var callback = args.pop();
      original.apply(this, args).then(function (value) {
        callback(null, value);
      }, function (err) {
        callback(err);
      });
    };
  }

  function inherits(ctor, superCtor) {
    Object.defineProperty(ctor, 'super_', { value: superCtor, writable: true, configurable: true });
    Object.setPrototypeOf(ctor.prototype, superCtor.prototype);
  }

  function deprecate(fn, message) {
    var warned = false;
    return function () {
      if (!warned) {
        warned = true;
        console.warn('DeprecationWarning: ' + message);
      }
      return fn.apply(this, arguments);
    };
  }

  return {
    format: format,
    inspect: function (value, options) {
      var depth = options && typeof options === 'object' ? options.depth : undefined;
      return inspect(value, depth === null ? Infinity : depth);
    },
    isDeepStrictEqual: isDeepStrictEqual,
    promisify: promisify,
    callbackify: callbackify,
    inherits: inherits,
    deprecate: deprecate,
    isArray: Array.isArray,
    types: types
  };
})"#;

/// `util`
pub fn util_module(context: &mut Context) -> JsResult<JsValue> {
    js_module(UTIL, &[], context)
}

/// `util/types`, the same object as `util.types`
pub fn util_types_module(context: &mut Context) -> JsResult<JsValue> {
    util_module(context)?
        .to_object(context)?
        .get(js_string!("types"), context)
}
