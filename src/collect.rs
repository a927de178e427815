//! # File Collector
//!
//! Walks a base directory against a glob-style pattern and produces a
//! [`FileManifest`]. Symlinks are recorded via `read_link` and never
//! dereferenced; regular files are wrapped in a lazy, repeatable content
//! source; directories are implied by the paths of the files they contain.
//!
//! Traversal lists entries in sorted order so the resulting manifest (and any
//! archive built from it) is deterministic. The per-entry stat/readlink work
//! is fanned out across a bounded pool of worker threads fed through a
//! bounded channel, which keeps the number of open file descriptors in check
//! on large trees.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::bounded;
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::common::{effective_workers, CancelToken};
use crate::manifest::{ContentSource, FileDescriptor, FileManifest};
use crate::PackError;

/// Options for a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Number of stat/readlink workers. `0` selects one per CPU.
    pub concurrency: usize,
    /// Cooperative cancellation; a cancelled run returns `PackError::Cancelled`.
    pub cancel: CancelToken,
}

/// Collect all filesystem entries under `base_dir` matching `pattern` into a
/// fresh manifest. See [`collect_with`] for the tunable variant.
pub fn collect(pattern: &str, base_dir: &Path) -> Result<FileManifest, PackError> {
    collect_with(pattern, base_dir, &CollectOptions::default())
}

/// Collect with explicit concurrency and cancellation options.
///
/// # Arguments
/// * `pattern` - Glob pattern; `**` matches across directories, `*` within a
///   single path segment, `{a,b}` alternates are supported.
/// * `base_dir` - Directory to walk. Must exist and be readable.
pub fn collect_with(
    pattern: &str,
    base_dir: &Path,
    options: &CollectOptions,
) -> Result<FileManifest, PackError> {
    if !base_dir.exists() {
        return Err(PackError::NotFound { path: base_dir.to_path_buf() });
    }

    let matcher = build_matcher(pattern)?;

    // Phase 1: enumerate matching paths in deterministic order, remembering
    // entries that could not be read instead of aborting on the first one.
    let mut matched: Vec<(PathBuf, String)> = Vec::new();
    let mut skipped: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(base_dir).follow_links(false).sort_by_file_name() {
        if options.cancel.is_cancelled() {
            return Err(PackError::Cancelled);
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base_dir.to_path_buf());
                if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
                    warn!(path = %path.display(), "skipping unreadable entry");
                    skipped.push(path);
                    continue;
                }
                return Err(PackError::Io {
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
                    path,
                });
            }
        };

        // Directories are traversed but never become manifest entries.
        if entry.file_type().is_dir() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(base_dir)
            .map_err(|_| PackError::Encoding {
                reason: format!("path '{}' is outside the base directory", entry.path().display()),
            })?;
        let rel_str = match rel.to_str() {
            Some(s) => s.replace('\\', "/"),
            None => {
                return Err(PackError::Encoding {
                    reason: format!("path '{}' is not valid UTF-8", rel.to_string_lossy()),
                })
            }
        };

        if matcher.is_match(&rel_str) {
            matched.push((entry.path().to_path_buf(), rel_str));
        }
    }

    debug!(matched = matched.len(), pattern, "collector walk finished");

    // Phase 2: fan the stat/readlink work out to a bounded worker pool.
    let descriptors = describe_entries(&matched, &mut skipped, options)?;

    let mut manifest = FileManifest::new();
    for (rel, descriptor) in descriptors {
        manifest.insert(rel, descriptor)?;
    }

    if manifest.is_empty() && !skipped.is_empty() {
        return Err(PackError::Permission { skipped });
    }
    if !skipped.is_empty() {
        warn!(count = skipped.len(), "collection completed with skipped entries");
    }

    Ok(manifest)
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher, PackError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| PackError::Encoding { reason: format!("invalid glob '{}': {}", pattern, e) })?;
    Ok(glob.compile_matcher())
}

type DescribeResult = (usize, String, Result<Option<FileDescriptor>, PackError>);

/// Build a descriptor for every matched path, preserving walk order.
///
/// Workers pull `(index, path)` tasks from a bounded channel and push results
/// back; the collector reassembles them by index. `Ok(None)` means the entry
/// vanished or was unreadable and has been recorded as skipped.
fn describe_entries(
    matched: &[(PathBuf, String)],
    skipped: &mut Vec<PathBuf>,
    options: &CollectOptions,
) -> Result<Vec<(String, FileDescriptor)>, PackError> {
    let workers = effective_workers(options.concurrency).min(matched.len().max(1));
    let (task_tx, task_rx) = bounded::<(usize, PathBuf, String)>(workers * 2);
    let (result_tx, result_rx) = bounded::<DescribeResult>(workers * 2);

    let mut slots: Vec<Option<(String, FileDescriptor)>> = vec![None; matched.len()];
    let mut first_error: Option<PackError> = None;

    thread::scope(|s| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = options.cancel.clone();
            s.spawn(move || {
                for (idx, path, rel) in task_rx {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let result = describe_one(&path);
                    if result_tx.send((idx, rel, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let cancel = options.cancel.clone();
        s.spawn(move || {
            for (idx, (path, rel)) in matched.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                if task_tx.send((idx, path.clone(), rel.clone())).is_err() {
                    break;
                }
            }
        });

        for (idx, rel, result) in result_rx {
            match result {
                Ok(Some(descriptor)) => slots[idx] = Some((rel, descriptor)),
                Ok(None) => skipped.push(matched[idx].0.clone()),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
    });

    if options.cancel.is_cancelled() {
        return Err(PackError::Cancelled);
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Stat one entry and build its descriptor. Returns `Ok(None)` when the entry
/// vanished between walk and stat, or is unreadable (recorded as skipped).
fn describe_one(path: &Path) -> Result<Option<FileDescriptor>, PackError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), "skipping unreadable entry");
            return Ok(None);
        }
        Err(e) => return Err(PackError::Io { source: e, path: path.to_path_buf() }),
    };

    let mode = mode_of(&metadata);

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)
            .map_err(|e| PackError::Io { source: e, path: path.to_path_buf() })?;
        let target = target.to_str().ok_or_else(|| PackError::Encoding {
            reason: format!("symlink target of '{}' is not valid UTF-8", path.display()),
        })?;
        return Ok(Some(FileDescriptor::symlink(mode, target)));
    }

    // Content is read lazily from the source path so the descriptor can be
    // consumed more than once (hashing, zipping, writing).
    Ok(Some(FileDescriptor::regular(mode, ContentSource::Path(path.to_path_buf()))))
}

#[cfg(unix)]
fn mode_of(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn mode_of(metadata: &std::fs::Metadata) -> u32 {
    use crate::manifest::{S_IFLNK, S_IFREG};
    if metadata.file_type().is_symlink() {
        S_IFLNK | 0o777
    } else {
        S_IFREG | 0o644
    }
}
