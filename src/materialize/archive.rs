//! # Archive Builder
//!
//! Serializes a [`FileManifest`] into an in-memory, zip-compatible buffer
//! suitable for Lambda-style execution environments.
//!
//! The critical invariant lives here: a symlink entry's data is the raw
//! target string and its Unix external attributes carry the `S_IFLNK`
//! (`0xA000`) file-type bits, so an attribute-aware extractor recreates a
//! symbolic link rather than a regular file containing the target text.
//! Regular entries are deflated with the descriptor's permission bits in the
//! upper 16 bits of the external-attributes word.
//!
//! Entries are written in manifest order; the same manifest and settings
//! produce the same bytes.

use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::common::CancelToken;
use crate::manifest::{validate_relative_path, FileKind, FileManifest};
use crate::PackError;

/// Default cap on total uncompressed entry bytes (250 MiB), matching the
/// unpacked-size limit of Lambda-style runtimes. Protects against a glob
/// accidentally pulling in a huge tree.
pub const DEFAULT_MAX_UNCOMPRESSED_SIZE: u64 = 250 * 1024 * 1024;

/// Options for an archive build.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Fail with `PackError::Encoding` once the sum of entry sizes passes
    /// this cap.
    pub max_uncompressed_size: u64,
    /// Cooperative cancellation; a cancelled build discards its buffer.
    pub cancel: CancelToken,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            max_uncompressed_size: DEFAULT_MAX_UNCOMPRESSED_SIZE,
            cancel: CancelToken::new(),
        }
    }
}

/// Build a zip-compatible archive buffer from the manifest.
pub fn build_archive(manifest: &FileManifest) -> Result<Vec<u8>, PackError> {
    build_archive_with(manifest, &ArchiveOptions::default())
}

/// Build an archive with explicit options. Single-shot: any failure aborts
/// the whole call and no partial buffer is returned.
pub fn build_archive_with(
    manifest: &FileManifest,
    options: &ArchiveOptions,
) -> Result<Vec<u8>, PackError> {
    // Security invariant: vet every path before the codec sees it.
    for path in manifest.paths() {
        validate_relative_path(path)?;
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut total_uncompressed: u64 = 0;

    for (rel, descriptor) in manifest.iter() {
        if options.cancel.is_cancelled() {
            return Err(PackError::Cancelled);
        }

        match &descriptor.kind {
            FileKind::Regular { content } => {
                let bytes = content.read_all()?;
                total_uncompressed += bytes.len() as u64;
                if total_uncompressed > options.max_uncompressed_size {
                    return Err(PackError::Encoding {
                        reason: format!(
                            "archive exceeds {} uncompressed bytes at entry '{}'",
                            options.max_uncompressed_size, rel
                        ),
                    });
                }
                let entry_options = FileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .unix_permissions(descriptor.mode);
                zip.start_file(rel, entry_options)?;
                zip.write_all(&bytes)
                    .map_err(|e| PackError::Encoding { reason: format!("entry '{}': {}", rel, e) })?;
            }
            FileKind::Symlink { target } => {
                total_uncompressed += target.len() as u64;
                // `add_symlink` stores the target as entry data and sets the
                // S_IFLNK file-type bits in the external attributes.
                let entry_options = FileOptions::default().unix_permissions(descriptor.mode & 0o7777);
                zip.add_symlink(rel, target.as_str(), entry_options)?;
            }
        }
    }

    let cursor = zip.finish()?;
    if options.cancel.is_cancelled() {
        return Err(PackError::Cancelled);
    }
    let buffer = cursor.into_inner();
    debug!(entries = manifest.len(), bytes = buffer.len(), "archive build finished");
    Ok(buffer)
}
