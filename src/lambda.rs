//! Lambda bundle assembly.
//!
//! A thin layer over the archive builder that pairs the zip buffer with the
//! execution metadata a Lambda-style service needs: handler entry point,
//! runtime identifier, and environment variables. Deployment itself is a
//! caller concern.

use std::collections::BTreeMap;

use crate::materialize::archive::{build_archive_with, ArchiveOptions};
use crate::manifest::FileManifest;
use crate::PackError;

/// Configuration for [`create_lambda`].
#[derive(Debug, Clone, Default)]
pub struct LambdaConfig {
    /// Function entry point, e.g. `"index.handler"`.
    pub handler: String,
    /// Runtime identifier, e.g. `"nodejs10.x"` (see [`crate::runtime`]).
    pub runtime: String,
    /// Environment variables baked into the function configuration.
    /// Ordered map so the bundle metadata is deterministic.
    pub environment: BTreeMap<String, String>,
    /// Archive constraints (size cap, cancellation).
    pub archive: ArchiveOptions,
}

/// A deployable function bundle: the archive plus its execution metadata.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub zip_buffer: Vec<u8>,
    pub handler: String,
    pub runtime: String,
    pub environment: BTreeMap<String, String>,
}

/// Build a [`Lambda`] from a manifest. Validates the configuration, then
/// serializes the manifest through the archive builder.
pub fn create_lambda(manifest: &FileManifest, config: LambdaConfig) -> Result<Lambda, PackError> {
    if config.handler.is_empty() {
        return Err(PackError::Other("lambda handler must not be empty".into()));
    }
    if config.runtime.is_empty() {
        return Err(PackError::Other("lambda runtime must not be empty".into()));
    }

    let zip_buffer = build_archive_with(manifest, &config.archive)?;
    Ok(Lambda {
        zip_buffer,
        handler: config.handler,
        runtime: config.runtime,
        environment: config.environment,
    })
}
