// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Builtin modules implemented by the host
//!
//! `require` of a builtin other than `fs` is answered from this registry.
//! A factory runs at most once per run; its value is shared by every module
//! context that asks for the same name.
//!
//! The default registry provides `path`, `events`, `util`, `os` and
//! `assert`, plus the `path/posix`, `util/types` and `assert/strict`
//! subpaths.

mod assert;
mod events;
mod os;
mod path;
mod util;

use boa_engine::{Context, JsResult, JsValue, Source};
use std::collections::BTreeMap;
use std::fmt;

pub use assert::assert_module;
pub use events::events_module;
pub use os::os_module;
pub use path::path_module;
pub use util::{util_module, util_types_module};

pub(crate) use os::platform;

/// Builds the exports of a host module in the calling realm
pub type HostModuleFactory = fn(&mut Context) -> JsResult<JsValue>;

/// Registry of host modules by builtin name
#[derive(Clone)]
pub struct HostModules {
    factories: BTreeMap<String, HostModuleFactory>,
}

impl HostModules {
    /// Registry without any modules
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) a module
    pub fn register(&mut self, name: impl Into<String>, factory: HostModuleFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, factory: HostModuleFactory) -> Self {
        self.register(name, factory);
        self
    }

    /// Factory registered under `name`
    pub fn get(&self, name: &str) -> Option<HostModuleFactory> {
        self.factories.get(name).copied()
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for HostModules {
    fn default() -> Self {
        Self::empty()
            .with("assert", assert_module)
            .with("assert/strict", assert_module)
            .with("events", events_module)
            .with("os", os_module)
            .with("path", path_module)
            .with("path/posix", path_module)
            .with("util", util_module)
            .with("util/types", util_types_module)
    }
}

impl fmt::Debug for HostModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Evaluate a module written as a JS function expression and call it
fn js_module(source: &'static str, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let factory = context.eval(Source::from_bytes(source))?.to_object(context)?;
    factory.call(&JsValue::undefined(), args, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let modules = HostModules::default();
        assert!(modules.contains("path"));
        assert!(modules.contains("events"));
        assert!(modules.get("http").is_none());
        assert_eq!(
            modules.names().collect::<Vec<_>>(),
            vec![
                "assert",
                "assert/strict",
                "events",
                "os",
                "path",
                "path/posix",
                "util",
                "util/types"
            ]
        );
        assert!(!HostModules::empty().contains("path"));
    }

    /// Install `module` as a global and evaluate `code` against it
    pub(super) fn eval_with(factory: HostModuleFactory, name: &str, code: &str) -> String {
        let mut context = Context::default();
        let module = factory(&mut context).unwrap();
        context
            .global_object()
            .set(boa_engine::JsString::from(name), module, true, &mut context)
            .unwrap();
        context
            .eval(Source::from_bytes(code))
            .unwrap()
            .to_string(&mut context)
            .unwrap()
            .to_std_string_escaped()
    }
}
