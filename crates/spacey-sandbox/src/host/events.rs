// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `events` module
//!
//! The module value is the `EventEmitter` constructor itself, with
//! `EventEmitter`, `once` and `defaultMaxListeners` hung off it.

use boa_engine::{Context, JsResult, JsValue};

use super::js_module;

const EVENTS: &str = r#"(function () {
  function EventEmitter() {
    EventEmitter.init.call(this);
  }

  EventEmitter.init = function () {
    if (!this._events || this._events === Object.getPrototypeOf(this)._events) {
      this._events = Object.create(null);
    }
    this._maxListeners = this._maxListeners || undefined;
  };

  EventEmitter.defaultMaxListeners = 10;

  function listenersOf(emitter, name) {
    if (!emitter._events) emitter._events = Object.create(null);
    return emitter._events[name] || (emitter._events[name] = []);
  }

  function add(emitter, name, listener, once, prepend) {
    if (typeof listener !== 'function') {
      throw new TypeError('The "listener" argument must be of type function');
    }
    if (emitter._events && emitter._events.newListener) {
      emitter.emit('newListener', name, listener);
    }
    var entry = { listener: listener, once: once };
    var list = listenersOf(emitter, name);
    if (prepend) list.unshift(entry); else list.push(entry);
    return emitter;
  }

  var proto = EventEmitter.prototype;

  proto.on = proto.addListener = function (name, listener) {
    return add(this, name, listener, false, false);
  };
  proto.prependListener = function (name, listener) {
    return add(this, name, listener, false, true);
  };
  proto.once = function (name, listener) {
    return add(this, name, listener, true, false);
  };
  proto.prependOnceListener = function (name, listener) {
    return add(this, name, listener, true, true);
  };

  proto.off = proto.removeListener = function (name, listener) {
    var list = this._events && this._events[name];
    if (!list) return this;
    for (var i = list.length - 1; i >= 0; i--) {
      if (list[i].listener === listener) {
        list.splice(i, 1);
        if (this._events.removeListener) this.emit('removeListener', name, listener);
        break;
      }
    }
    if (list.length === 0) delete this._events[name];
    return this;
  };

  proto.removeAllListeners = function (name) {
    if (!this._events) return this;
    if (arguments.length === 0) this._events = Object.create(null);
    else delete this._events[name];
    return this;
  };

  proto.emit = function (name) {
    var list = this._events && this._events[name];
    var args = Array.prototype.slice.call(arguments, 1);
    if (!list || list.length === 0) {
      if (name === 'error') {
        var err = args[0];
        throw err instanceof Error ? err : new Error('Unhandled error. (' + err + ')');
      }
      return false;
    }
    var snapshot = list.slice();
    for (var i = 0; i < snapshot.length; i++) {
      var entry = snapshot[i];
      if (entry.once) this.removeListener(name, entry.listener);
      entry.listener.apply(this, args);
    }
    return true;
  };

  proto.listenerCount = function (name) {
    var list = this._events && this._events[name];
    return list ? list.length : 0;
  };
  proto.listeners = proto.rawListeners = function (name) {
    var list = (this._events && this._events[name]) || [];
    return list.map(function (entry) { return entry.listener; });
  };
  proto.eventNames = function () {
    return this._events ? Object.keys(this._events) : [];
  };
  proto.setMaxListeners = function (n) {
    this._maxListeners = n;
    return this;
  };
  proto.getMaxListeners = function () {
    return this._maxListeners === undefined ? EventEmitter.defaultMaxListeners : this._maxListeners;
  };

  EventEmitter.once = function (emitter, name) {
    return new Promise(function (resolve, reject) {
      function onError(err) {
        emitter.removeListener(name, onEvent);
        reject(err);
      }
      function onEvent() {
        if (name !== 'error') emitter.removeListener('error', onError);
        resolve(Array.prototype.slice.call(arguments));
      }
      emitter.once(name, onEvent);
      if (name !== 'error') emitter.once('error', onError);
    });
  };

  EventEmitter.EventEmitter = EventEmitter;
  return EventEmitter;
})"#;

/// `events`, exporting the `EventEmitter` constructor
pub fn events_module(context: &mut Context) -> JsResult<JsValue> {
    js_module(EVENTS, &[], context)
}
