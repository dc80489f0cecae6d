// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `os`, describing the host the sandbox runs on

use boa_engine::{Context, JsResult, JsValue};
use std::env::consts;

use super::js_module;

/// Called with a plain object of host facts
const OS: &str = r#"(function (info) {
  function constant(value) {
    return function () { return value; };
  }
  return {
    EOL: info.eol,
    devNull: info.devNull,
    platform: constant(info.platform),
    type: constant(info.type),
    arch: constant(info.arch),
    release: constant(''),
    hostname: constant('localhost'),
    homedir: constant(info.homedir),
    tmpdir: constant(info.tmpdir),
    endianness: constant(info.endianness),
    availableParallelism: constant(info.parallelism),
    cpus: function () { return []; },
    uptime: constant(0),
    loadavg: function () { return [0, 0, 0]; },
    freemem: constant(0),
    totalmem: constant(0),
    networkInterfaces: function () { return {}; },
    userInfo: function () {
      return { username: '', uid: -1, gid: -1, shell: null, homedir: info.homedir };
    },
    constants: { signals: {}, errno: {} }
  };
})"#;

/// Name reported by `os.type()`
fn os_type() -> &'static str {
    match consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        other => other,
    }
}

/// Name reported by `os.platform()` and `process.platform`
pub(crate) fn platform() -> &'static str {
    match consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Name reported by `os.arch()`
fn arch() -> &'static str {
    match consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}

fn host_info() -> serde_json::Value {
    let home = dirs::home_dir().unwrap_or_else(|| "/".into());
    serde_json::json!({
        "eol": if cfg!(windows) { "\r\n" } else { "\n" },
        "devNull": if cfg!(windows) { "\\\\.\\nul" } else { "/dev/null" },
        "platform": platform(),
        "type": os_type(),
        "arch": arch(),
        "homedir": home.to_string_lossy(),
        "tmpdir": std::env::temp_dir().to_string_lossy(),
        "endianness": if cfg!(target_endian = "little") { "LE" } else { "BE" },
        "parallelism": std::thread::available_parallelism().map_or(1, |n| n.get()),
    })
}

/// `os`
pub fn os_module(context: &mut Context) -> JsResult<JsValue> {
    let info = JsValue::from_json(&host_info(), context)?;
    js_module(OS, &[info], context)
}

#[cfg(test)]
mod tests {
    use super::super::tests::eval_with;
    use super::*;

    #[test]
    fn test_os_module() {
        let result = eval_with(
            os_module,
            "os",
            "[os.platform(), os.arch(), os.EOL === '\\n' || os.EOL === '\\r\\n', \
              typeof os.tmpdir(), os.availableParallelism() >= 1].join('|')",
        );
        assert_eq!(result, format!("{}|{}|true|string|true", platform(), arch()));
    }

    #[test]
    fn test_platform_names() {
        assert!(!platform().is_empty());
        assert_ne!(platform(), "macos");
        assert_ne!(arch(), "x86_64");
    }
}
