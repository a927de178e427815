//! Cross-platform filesystem wrapper.
//!
//! On Unix these helpers forward to `std::fs` / `std::os::unix::fs`. On other
//! platforms the permission setter is a no-op and symlink creation reports an
//! unsupported-filesystem error, so the call-sites stay identical across OSes.

use std::io;
use std::path::Path;

#[cfg(unix)]
/// Set POSIX permission bits on Unix.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
/// No-op outside Unix: POSIX permission bits are not preserved.
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
/// Create a symbolic link at `link` whose payload is exactly `target`.
/// The target string is never resolved or rewritten.
pub fn symlink(target: &str, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
pub fn symlink(_target: &str, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("symlink creation not supported on this platform: {}", link.display()),
    ))
}
