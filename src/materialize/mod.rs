//! # Manifest Materializer
//!
//! Turns an in-memory [`FileManifest`] back into a concrete representation:
//! either a tree on disk (this module) or a zip-compatible archive buffer
//! ([`archive`]). Symlinks survive both paths as symlinks; a link is never
//! silently converted into a copy of the file it points at.

pub mod archive;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::debug;

use crate::common::{effective_workers, CancelToken};
use crate::fsx;
use crate::manifest::{validate_relative_path, ContentSource, FileDescriptor, FileKind, FileManifest};
use crate::PackError;

/// Options for a disk materialization run.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Number of parallel writers. `0` selects one per CPU.
    pub concurrency: usize,
    /// Cooperative cancellation; partially-written state is left as-is.
    pub cancel: CancelToken,
}

/// Write every manifest entry under `out_dir`, recreating regular files and
/// symlinks with their original modes. See [`write_to_disk_with`].
pub fn write_to_disk(manifest: &FileManifest, out_dir: &Path) -> Result<FileManifest, PackError> {
    write_to_disk_with(manifest, out_dir, &MaterializeOptions::default())
}

/// Write a manifest onto disk with explicit options.
///
/// Entries are written concurrently; a path's parent directories are always
/// created before its content (per-entry `create_dir_all`, idempotent under
/// concurrent siblings). An existing file, symlink, or directory at a target
/// path is removed first, so repeated writes are last-write-wins even when
/// the entry kind changes between runs.
///
/// Returns a manifest describing what was written: regular entries point at
/// their new on-disk location, so the result can be re-verified or re-packed.
/// The first OS-level denial aborts the run with the offending path;
/// already-completed writes are left in place.
pub fn write_to_disk_with(
    manifest: &FileManifest,
    out_dir: &Path,
    options: &MaterializeOptions,
) -> Result<FileManifest, PackError> {
    // Security invariant: vet every path before any I/O happens.
    for path in manifest.paths() {
        validate_relative_path(path)?;
    }

    fs::create_dir_all(out_dir)
        .map_err(|e| PackError::Filesystem { source: e, path: out_dir.to_path_buf() })?;

    let entries: Vec<(&str, &FileDescriptor)> = manifest.iter().collect();
    let written = Mutex::new(vec![false; entries.len()]);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_workers(options.concurrency))
        .build()
        .map_err(|e| PackError::Other(Box::new(e)))?;

    let result = pool.install(|| {
        entries
            .par_iter()
            .enumerate()
            .try_for_each(|(idx, (rel, descriptor))| -> Result<(), PackError> {
                if options.cancel.is_cancelled() {
                    return Err(PackError::Cancelled);
                }
                write_entry(out_dir, rel, descriptor)?;
                written.lock().unwrap()[idx] = true;
                Ok(())
            })
    });

    let written = written.into_inner().unwrap();
    let done = written.iter().filter(|w| **w).count();
    debug!(entries = entries.len(), written = done, out_dir = %out_dir.display(), "disk write finished");

    result?;

    // Describe the tree that now exists on disk, in manifest order.
    let mut out = FileManifest::new();
    for (idx, (rel, descriptor)) in entries.iter().enumerate() {
        if !written[idx] {
            continue;
        }
        let described = match &descriptor.kind {
            FileKind::Regular { .. } => {
                FileDescriptor::regular(descriptor.mode, ContentSource::Path(out_dir.join(rel)))
            }
            FileKind::Symlink { target } => FileDescriptor::symlink(descriptor.mode, target.clone()),
        };
        out.insert(*rel, described)?;
    }
    Ok(out)
}

fn write_entry(out_dir: &Path, rel: &str, descriptor: &FileDescriptor) -> Result<(), PackError> {
    let target = out_dir.join(rel);
    let fs_err = |e: std::io::Error, path: &Path| PackError::Filesystem { source: e, path: path.to_path_buf() };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_err(e, parent))?;
    }

    remove_existing(&target)?;

    match &descriptor.kind {
        FileKind::Regular { content } => {
            let mut reader = content.open()?;
            let mut file = fs::File::create(&target).map_err(|e| fs_err(e, &target))?;
            std::io::copy(&mut reader, &mut file).map_err(|e| fs_err(e, &target))?;
            fsx::set_unix_permissions(&target, descriptor.mode & 0o7777).map_err(|e| fs_err(e, &target))?;
        }
        FileKind::Symlink { target: link_target } => {
            fsx::symlink(link_target, &target).map_err(|e| fs_err(e, &target))?;
        }
    }
    Ok(())
}

/// Remove whatever currently occupies `path`, whichever kind it is.
/// `symlink_metadata` so a stale link is removed, not its referent.
fn remove_existing(path: &PathBuf) -> Result<(), PackError> {
    match fs::symlink_metadata(path) {
        Ok(md) => {
            let removal = if md.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };
            removal.map_err(|e| PackError::Filesystem { source: e, path: path.clone() })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PackError::Filesystem { source: e, path: path.clone() }),
    }
}
