//! # File Manifests
//!
//! This module defines the in-memory representation of a build's file set:
//! an ordered mapping from POSIX-style relative path to a [`FileDescriptor`]
//! that captures either a regular file's content or a symlink's raw target,
//! plus the entry's mode bits.
//!
//! A manifest is produced by the collector, consumed read-only by the
//! materializers, and never shared mutably between calls.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::PackError;

/// `st_mode` file-type mask.
pub const S_IFMT: u32 = 0o170000;
/// `st_mode` file-type bits for a symbolic link (`0xA000` in the high nibble).
pub const S_IFLNK: u32 = 0o120000;
/// `st_mode` file-type bits for a regular file.
pub const S_IFREG: u32 = 0o100000;

/// Returns true if `mode` carries the symlink file-type bits.
pub fn is_symlink_mode(mode: u32) -> bool {
    mode & S_IFMT == S_IFLNK
}

/// A source of file bytes that can be opened and read repeatedly.
///
/// Archive building and disk writing may each consume the same descriptor's
/// bytes independently, so a one-shot stream is not enough.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Lazy read from a file on disk. Bytes are fetched on each `open`,
    /// so the source file must outlive the manifest.
    Path(PathBuf),
    /// A sealed in-memory buffer.
    Bytes(Arc<Vec<u8>>),
}

impl ContentSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ContentSource::Bytes(Arc::new(bytes))
    }

    /// Open a fresh reader over the content. Callable any number of times,
    /// including concurrently.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, PackError> {
        match self {
            ContentSource::Path(path) => {
                let file = File::open(path)
                    .map_err(|e| PackError::Io { source: e, path: path.clone() })?;
                Ok(Box::new(file))
            }
            ContentSource::Bytes(bytes) => Ok(Box::new(io::Cursor::new(ArcBytes(bytes.clone())))),
        }
    }

    /// Read the full content into a buffer.
    pub fn read_all(&self) -> Result<Vec<u8>, PackError> {
        match self {
            ContentSource::Path(path) => {
                std::fs::read(path).map_err(|e| PackError::Io { source: e, path: path.clone() })
            }
            ContentSource::Bytes(bytes) => Ok(bytes.as_ref().clone()),
        }
    }
}

// Cursor needs AsRef<[u8]>; Arc<Vec<u8>> doesn't provide it directly.
struct ArcBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for ArcBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// The closed set of entry shapes. A symlink never carries byte content and
/// a regular file never carries a target; the type system enforces it.
#[derive(Debug, Clone)]
pub enum FileKind {
    Regular { content: ContentSource },
    Symlink { target: String },
}

/// One entry of a [`FileManifest`]: mode bits as reported by `lstat`, plus
/// the entry's kind.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub mode: u32,
    pub kind: FileKind,
}

impl FileDescriptor {
    /// A regular-file descriptor backed by the given content source.
    pub fn regular(mode: u32, content: ContentSource) -> Self {
        Self { mode, kind: FileKind::Regular { content } }
    }

    /// A symlink descriptor recording the raw link payload.
    pub fn symlink(mode: u32, target: impl Into<String>) -> Self {
        Self { mode, kind: FileKind::Symlink { target: target.into() } }
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, FileKind::Symlink { .. })
    }
}

/// Reject paths that could escape the manifest root or that the archive
/// format cannot represent. This is a security invariant: both materializers
/// call it before performing any I/O.
pub fn validate_relative_path(path: &str) -> Result<(), PackError> {
    let unsafe_path = || PackError::UnsafePath { path: path.to_string() };

    if path.is_empty() || path.starts_with('/') {
        return Err(unsafe_path());
    }
    if path.contains('\0') || path.contains('\\') {
        return Err(unsafe_path());
    }
    if path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        return Err(unsafe_path());
    }
    Ok(())
}

/// An ordered mapping from relative path to [`FileDescriptor`].
///
/// Insertion order is preserved so that archives built from the same manifest
/// are byte-for-byte reproducible. Paths are unique; re-inserting a path
/// replaces the descriptor in place without moving it.
#[derive(Debug, Clone, Default)]
pub struct FileManifest {
    entries: Vec<(String, FileDescriptor)>,
    index: HashMap<String, usize>,
}

impl FileManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, validating the path first.
    pub fn insert(&mut self, path: impl Into<String>, descriptor: FileDescriptor) -> Result<(), PackError> {
        let path = path.into();
        validate_relative_path(&path)?;
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = descriptor,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, descriptor));
            }
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&FileDescriptor> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileDescriptor)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// Produce a new manifest with every path mapped through `f`, keeping
    /// entry order. Fails if `f` produces an unsafe or duplicate path.
    pub fn rename<F>(&self, mut f: F) -> Result<FileManifest, PackError>
    where
        F: FnMut(&str) -> String,
    {
        let mut out = FileManifest::new();
        for (path, descriptor) in &self.entries {
            let new_path = f(path);
            if out.contains(&new_path) {
                return Err(PackError::UnsafePath { path: new_path });
            }
            out.insert(new_path, descriptor.clone())?;
        }
        Ok(out)
    }
}
