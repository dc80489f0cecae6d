// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `assert`, always in strict mode

use boa_engine::{Context, JsResult, JsValue};

use super::{js_module, util_module};

/// Called with the `util` module for deep equality
const ASSERT: &str = r#"(function (util) {
  function AssertionError(options) {
    var err = new Error(options.message);
    Object.setPrototypeOf(err, AssertionError.prototype);
    err.name = 'AssertionError';
    err.code = 'ERR_ASSERTION';
    err.actual = options.actual;
    err.expected = options.expected;
    err.operator = options.operator;
    return err;
  }
  AssertionError.prototype = Object.create(Error.prototype);
  AssertionError.prototype.constructor = AssertionError;

  function fail(actual, expected, message, operator, fallback) {
    if (message instanceof Error) throw message;
    throw new AssertionError({
      message: message !== undefined ? message : fallback,
      actual: actual,
      expected: expected,
      operator: operator
    });
  }

  function show(value) {
    return util.inspect(value);
  }

  function assert(value, message) {
    if (!value) fail(value, true, message, '==', 'The expression evaluated to a falsy value');
  }

  assert.ok = assert;
  assert.fail = function (message) {
    fail(undefined, undefined, message, 'fail', 'Failed');
  };
  assert.equal = assert.strictEqual = function (actual, expected, message) {
    if (!Object.is(actual, expected)) {
      fail(actual, expected, message, 'strictEqual',
        'Expected values to be strictly equal: ' + show(actual) + ' !== ' + show(expected));
    }
  };
  assert.notEqual = assert.notStrictEqual = function (actual, expected, message) {
    if (Object.is(actual, expected)) {
      fail(actual, expected, message, 'notStrictEqual',
        'Expected "actual" to be strictly unequal to: ' + show(expected));
    }
  };
  assert.deepEqual = assert.deepStrictEqual = function (actual, expected, message) {
    if (!util.isDeepStrictEqual(actual, expected)) {
      fail(actual, expected, message, 'deepStrictEqual',
        'Expected values to be strictly deep-equal: ' + show(actual) + ' vs ' + show(expected));
    }
  };
  assert.notDeepEqual = assert.notDeepStrictEqual = function (actual, expected, message) {
    if (util.isDeepStrictEqual(actual, expected)) {
      fail(actual, expected, message, 'notDeepStrictEqual',
        'Expected "actual" not to be strictly deep-equal to: ' + show(expected));
    }
  };
  assert.throws = function (block, expected, message) {
    if (typeof expected === 'string') {
      message = expected;
      expected = undefined;
    }
    try {
      block();
    } catch (err) {
      if (typeof expected === 'function' && expected.prototype !== undefined && !(err instanceof expected)) {
        throw err;
      }
      if (expected instanceof RegExp && !expected.test(String(err && err.message))) {
        fail(err, expected, message, 'throws', 'The error message does not match ' + expected);
      }
      return;
    }
    fail(undefined, expected, message, 'throws', 'Missing expected exception.');
  };
  assert.doesNotThrow = function (block, message) {
    try {
      block();
    } catch (err) {
      fail(err, undefined, message, 'doesNotThrow', 'Got unwanted exception: ' + (err && err.message));
    }
  };
  assert.match = function (string, regexp, message) {
    if (!regexp.test(string)) {
      fail(string, regexp, message, 'match',
        'The input did not match the regular expression ' + regexp);
    }
  };

  assert.AssertionError = AssertionError;
  assert.strict = assert;
  return assert;
})"#;

/// `assert` (and `assert/strict`)
pub fn assert_module(context: &mut Context) -> JsResult<JsValue> {
    let util = util_module(context)?;
    js_module(ASSERT, &[util], context)
}

#[cfg(test)]
mod tests {
    use super::super::tests::eval_with;
    use super::*;

    #[test]
    fn test_passing_assertions() {
        let result = eval_with(
            assert_module,
            "assert",
            "assert(1); assert.strictEqual(NaN, NaN); assert.deepStrictEqual({ a: [1] }, { a: [1] });
             assert.throws(function () { throw new TypeError('bad'); }, TypeError);
             assert.throws(function () { throw new Error('nope'); }, /no/);
             assert.match('abc', /b/);
             assert.strict === assert",
        );
        assert_eq!(result, "true");
    }

    #[test]
    fn test_failures() {
        let result = eval_with(
            assert_module,
            "assert",
            "function failure(block) {
               try { block(); } catch (e) { return e.name + ':' + e.code + ':' + e.message; }
               return 'passed';
             }
             [failure(function () { assert.strictEqual(1, 2); }),
              failure(function () { assert.ok(0, 'custom'); }),
              failure(function () { assert.throws(function () {}); })].join('|')",
        );
        assert_eq!(
            result,
            "AssertionError:ERR_ASSERTION:Expected values to be strictly equal: 1 !== 2|\
             AssertionError:ERR_ASSERTION:custom|\
             AssertionError:ERR_ASSERTION:Missing expected exception."
        );
    }
}
