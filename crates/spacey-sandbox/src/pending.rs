// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Deferred work scheduled while bundles evaluate
//!
//! Script-tag loads, file reads and timers are not run where they are
//! requested. They are queued here and drained by the executor after every
//! bundle has been evaluated, which is the single point where a run waits for
//! outstanding loads.

use boa_engine::builtins::promise::ResolvingFunctions;
use boa_engine::{JsObject, JsValue};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

/// How file contents are handed back to JavaScript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEncoding {
    /// UTF-8 text
    Utf8,
    /// One character per byte (Latin-1), for building byte arrays in script
    Binary,
}

impl ReadEncoding {
    /// Parse a Node.js-style encoding name; anything unknown reads bytes
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.to_ascii_lowercase()).as_deref() {
            Some("utf8" | "utf-8") => Self::Utf8,
            _ => Self::Binary,
        }
    }

    /// Decode bytes into the string handed to JavaScript
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Binary => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// One unit of deferred work
pub enum PendingLoad {
    /// A `<script>` node appended to the document
    Script {
        /// File the script's `src` points at
        path: PathBuf,
        /// The appended node, whose `onload` fires after evaluation
        element: JsObject,
    },
    /// An asynchronous file read backing a promise
    Read {
        /// File to read
        path: PathBuf,
        /// Result encoding
        encoding: ReadEncoding,
        /// Settles the promise handed to script
        resolvers: ResolvingFunctions,
    },
    /// A `setTimeout`/`setImmediate` callback
    Timer {
        /// Timer id returned to script
        id: u32,
        /// Callback
        callback: JsObject,
        /// Extra arguments
        args: Vec<JsValue>,
    },
}

impl std::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script { path, .. } => f.debug_struct("Script").field("path", path).finish(),
            Self::Read { path, encoding, .. } => f
                .debug_struct("Read")
                .field("path", path)
                .field("encoding", encoding)
                .finish(),
            Self::Timer { id, .. } => f.debug_struct("Timer").field("id", id).finish(),
        }
    }
}

/// FIFO of deferred work owned by one run
#[derive(Debug, Default)]
pub struct PendingQueue {
    tasks: VecDeque<PendingLoad>,
    next_timer: u32,
    cancelled: HashSet<u32>,
}

impl PendingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task
    pub fn push(&mut self, task: PendingLoad) {
        self.tasks.push_back(task);
    }

    /// Queue a timer callback and return its id
    pub fn push_timer(&mut self, callback: JsObject, args: Vec<JsValue>) -> u32 {
        self.next_timer += 1;
        let id = self.next_timer;
        self.tasks.push_back(PendingLoad::Timer { id, callback, args });
        id
    }

    /// Cancel a queued timer
    pub fn cancel_timer(&mut self, id: u32) {
        self.cancelled.insert(id);
    }

    /// Next task to run, skipping cancelled timers
    pub fn pop(&mut self) -> Option<PendingLoad> {
        while let Some(task) = self.tasks.pop_front() {
            if let PendingLoad::Timer { id, .. } = &task {
                if self.cancelled.remove(id) {
                    continue;
                }
            }
            return Some(task);
        }
        None
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop everything still queued
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.cancelled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Context;

    #[test]
    fn test_encoding() {
        assert_eq!(ReadEncoding::from_name(Some("UTF-8")), ReadEncoding::Utf8);
        assert_eq!(ReadEncoding::from_name(None), ReadEncoding::Binary);
        assert_eq!(ReadEncoding::Binary.decode(&[0x68, 0xff]), "h\u{ff}");
        assert_eq!(ReadEncoding::Utf8.decode("é".as_bytes()), "é");
    }

    #[test]
    fn test_cancelled_timers_are_skipped() {
        let context = Context::default();
        let callback = JsObject::with_object_proto(context.intrinsics());
        let mut queue = PendingQueue::new();

        let first = queue.push_timer(callback.clone(), Vec::new());
        let second = queue.push_timer(callback, Vec::new());
        queue.cancel_timer(first);

        match queue.pop() {
            Some(PendingLoad::Timer { id, .. }) => assert_eq!(id, second),
            other => panic!("unexpected task: {other:?}"),
        }
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }
}
