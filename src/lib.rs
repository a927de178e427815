//! # artipack
//!
//! Artifact-packaging core for a serverless build pipeline: collect source
//! files into a symlink-faithful manifest, materialize that manifest back
//! onto disk or into a Lambda-compatible zip buffer, and resolve a runtime
//! version-range selector against a curated support matrix.
//!
//! ## Key Modules
//!
//! - [`manifest`]: The in-memory file manifest and its descriptors.
//! - [`collect`]: Glob-driven collection of a directory tree into a manifest.
//! - [`materialize`]: Disk writer and zip-compatible archive builder.
//! - [`runtime`]: Version-range resolution against the runtime support matrix.
//! - [`lambda`]: Archive buffer + handler/runtime metadata bundles.
//!
//! ## Example
//!
//! ```no_run
//! use artipack::{collect, materialize};
//!
//! # fn main() -> Result<(), artipack::PackError> {
//! let files = collect::collect("**", std::path::Path::new("./src"))?;
//! let zip = materialize::archive::build_archive(&files)?;
//! # let _ = zip;
//! # Ok(())
//! # }
//! ```

pub mod collect;
pub mod common;
pub mod lambda;
pub mod manifest;
pub mod materialize;
pub mod runtime;

pub mod error;
pub use error::PackError;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use collect::{collect, collect_with, CollectOptions};
pub use common::CancelToken;
pub use lambda::{create_lambda, Lambda, LambdaConfig};
pub use manifest::{ContentSource, FileDescriptor, FileKind, FileManifest};
pub use materialize::archive::{build_archive, build_archive_with, ArchiveOptions};
pub use materialize::{write_to_disk, write_to_disk_with, MaterializeOptions};
pub use runtime::{node_matrix, RuntimeMatrix, SupportedRuntime};
