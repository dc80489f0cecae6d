// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Virtual file system interface
//!
//! Resolution and sandboxed execution only ever reach files through
//! [`FileSystem`]. [`OsFs`] forwards to the real disk, [`MemoryFs`] keeps a
//! hermetic in-memory tree for tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::path::normalize_path;

/// Kind of a file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Result of a `stat` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Entry kind
    pub kind: FileKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl FileStat {
    /// Whether the entry is a regular file
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// File system seen by the resolver and the sandbox
#[async_trait]
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Read a whole file
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read a whole file, blocking
    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Stat an entry, blocking
    fn stat_sync(&self, path: &Path) -> io::Result<FileStat>;

    /// Stat an entry
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.stat_sync(path)
    }

    /// Whether `path` names an existing regular file
    fn is_file(&self, path: &Path) -> bool {
        self.stat_sync(path).map(|s| s.is_file()).unwrap_or(false)
    }

    /// Whether `path` names an existing directory
    fn is_dir(&self, path: &Path) -> bool {
        self.stat_sync(path).map(|s| s.is_dir()).unwrap_or(false)
    }

    /// Read a UTF-8 file, blocking
    fn read_to_string_sync(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_file_sync(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// The real disk
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

#[async_trait]
impl FileSystem for OsFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            kind: if meta.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            },
            size: if meta.is_dir() { 0 } else { meta.len() },
        })
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            kind: if meta.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            },
            size: if meta.is_dir() { 0 } else { meta.len() },
        })
    }
}

/// In-memory file tree
///
/// Directories exist implicitly as ancestors of stored files. Every read and
/// stat bumps an access counter so tests can assert that a code path never
/// touched the file system.
#[derive(Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    accesses: AtomicUsize,
}

impl MemoryFs {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryFs::write_file`]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.write_file(path, contents);
        self
    }

    /// Store a file, replacing any previous contents
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.files
            .write()
            .insert(normalize_path(path.as_ref()), contents.into());
    }

    /// Remove a file
    pub fn remove_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.write().remove(&normalize_path(path.as_ref()))
    }

    /// Number of reads and stats served so far
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::Relaxed)
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("ENOENT: no such file or directory, '{}'", path.display()),
        )
    }
}

impl fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFs")
            .field("files", &self.files.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.read_file_sync(path)
    }

    fn read_file_sync(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        let path = normalize_path(path);
        let files = self.files.read();
        match files.get(&path) {
            Some(contents) => Ok(contents.clone()),
            None if files.keys().any(|f| f.starts_with(&path)) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("EISDIR: illegal operation on a directory, '{}'", path.display()),
            )),
            None => Err(Self::not_found(&path)),
        }
    }

    fn stat_sync(&self, path: &Path) -> io::Result<FileStat> {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        let path = normalize_path(path);
        let files = self.files.read();
        if let Some(contents) = files.get(&path) {
            return Ok(FileStat {
                kind: FileKind::File,
                size: contents.len() as u64,
            });
        }
        if files.keys().any(|f| f.starts_with(&path)) {
            return Ok(FileStat {
                kind: FileKind::Directory,
                size: 0,
            });
        }
        Err(Self::not_found(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_fs_implicit_directories() {
        let fs = MemoryFs::new().with_file("/app/src/index.js", "1");

        assert!(fs.is_file(Path::new("/app/src/index.js")));
        assert!(fs.is_dir(Path::new("/app/src")));
        assert!(fs.is_dir(Path::new("/app")));
        assert!(!fs.is_file(Path::new("/app/src")));
        assert!(!fs.is_dir(Path::new("/app/sr")));
        assert_eq!(fs.accesses(), 5);
    }

    #[test]
    fn test_memory_fs_read_errors() {
        let fs = MemoryFs::new().with_file("/app/index.js", "x");

        let missing = fs.read_file_sync(Path::new("/app/missing.js")).unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
        assert!(fs.read_file_sync(Path::new("/app")).is_err());
        assert_eq!(
            fs.read_to_string_sync(Path::new("/app/./index.js")).unwrap(),
            "x"
        );
    }

    #[tokio::test]
    async fn test_os_fs() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bundle.js");
        std::fs::write(&file, b"module.exports = 1;").unwrap();

        let fs = OsFs;
        assert!(fs.is_file(&file));
        assert!(fs.is_dir(dir.path()));
        assert_eq!(fs.read_file(&file).await.unwrap(), b"module.exports = 1;");
        assert!(fs.stat(&file).await.unwrap().is_file());
        assert!(fs.stat(&dir.path().join("nope")).await.is_err());
    }
}
