// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Captured `console`

use boa_engine::{Context, JsResult, JsValue, js_string};
use boa_gc::{Finalize, Trace};
use std::fmt;
use std::rc::Rc;

use super::{RunState, Shim, native, set};

/// Severity of a console call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    /// `console.log`
    Log,
    /// `console.info`
    Info,
    /// `console.debug` and `console.trace`
    Debug,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// One line written by sandboxed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    /// Method that was called
    pub level: ConsoleLevel,
    /// Arguments joined with spaces
    pub text: String,
}

#[derive(Clone, Trace, Finalize)]
struct ConsoleShim {
    #[unsafe_ignore_trace]
    state: Rc<RunState>,
    #[unsafe_ignore_trace]
    level: ConsoleLevel,
}

const METHODS: &[(&str, ConsoleLevel)] = &[
    ("log", ConsoleLevel::Log),
    ("info", ConsoleLevel::Info),
    ("debug", ConsoleLevel::Debug),
    ("trace", ConsoleLevel::Debug),
    ("warn", ConsoleLevel::Warn),
    ("error", ConsoleLevel::Error),
];

pub(super) fn install(context: &mut Context, shim: &Shim) -> JsResult<()> {
    let console = boa_engine::JsObject::with_object_proto(context.intrinsics());
    for &(name, level) in METHODS {
        let captures = ConsoleShim {
            state: shim.state.clone(),
            level,
        };
        let method = native(context, name, 0, captures, write);
        set(&console, name, method, context)?;
    }

    let global = context.global_object();
    global.set(js_string!("console"), console, true, context)?;
    Ok(())
}

fn write(_this: &JsValue, args: &[JsValue], shim: &ConsoleShim, context: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        if arg.is_string() {
            parts.push(arg.to_string(context)?.to_std_string_escaped());
        } else {
            parts.push(arg.display().to_string());
        }
    }
    let text = parts.join(" ");

    match shim.level {
        ConsoleLevel::Error => tracing::error!(target: "spacey_sandbox::console", "{text}"),
        ConsoleLevel::Warn => tracing::warn!(target: "spacey_sandbox::console", "{text}"),
        ConsoleLevel::Debug => tracing::debug!(target: "spacey_sandbox::console", "{text}"),
        ConsoleLevel::Log | ConsoleLevel::Info => {
            tracing::info!(target: "spacey_sandbox::console", "{text}")
        }
    }

    shim.state.console.borrow_mut().push(ConsoleMessage {
        level: shim.level,
        text,
    });
    Ok(JsValue::undefined())
}
