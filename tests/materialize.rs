#![cfg(unix)]

use std::fs;

use artipack::manifest::{ContentSource, FileDescriptor, FileManifest};
use artipack::{write_to_disk, write_to_disk_with, CancelToken, MaterializeOptions, PackError};
use tempfile::tempdir;

fn regular(bytes: &[u8]) -> FileDescriptor {
    FileDescriptor::regular(0o100644, ContentSource::from_bytes(bytes.to_vec()))
}

#[test]
fn double_write_is_idempotent() {
    let mut manifest = FileManifest::new();
    manifest.insert("dir/file.txt", regular(b"payload")).unwrap();
    manifest.insert("top.txt", regular(b"top")).unwrap();

    let out = tempdir().unwrap();
    write_to_disk(&manifest, out.path()).unwrap();
    write_to_disk(&manifest, out.path()).unwrap();

    assert_eq!(fs::read(out.path().join("dir/file.txt")).unwrap(), b"payload");
    assert_eq!(fs::read(out.path().join("top.txt")).unwrap(), b"top");
}

#[test]
fn kind_switch_replaces_the_stale_entry() {
    let out = tempdir().unwrap();

    let mut as_file = FileManifest::new();
    as_file.insert("entry", regular(b"i am a file")).unwrap();
    write_to_disk(&as_file, out.path()).unwrap();
    assert!(fs::symlink_metadata(out.path().join("entry")).unwrap().is_file());

    // file -> symlink
    let mut as_link = FileManifest::new();
    as_link.insert("entry", FileDescriptor::symlink(0o120777, "somewhere")).unwrap();
    write_to_disk(&as_link, out.path()).unwrap();
    let md = fs::symlink_metadata(out.path().join("entry")).unwrap();
    assert!(md.file_type().is_symlink());
    assert_eq!(fs::read_link(out.path().join("entry")).unwrap().to_str(), Some("somewhere"));

    // symlink -> file again; the link must not be followed during removal
    write_to_disk(&as_file, out.path()).unwrap();
    let md = fs::symlink_metadata(out.path().join("entry")).unwrap();
    assert!(md.is_file());
    assert_eq!(fs::read(out.path().join("entry")).unwrap(), b"i am a file");
}

#[test]
fn escaping_paths_never_reach_the_filesystem() {
    let mut manifest = FileManifest::new();
    for bad in ["../escape.txt", "/etc/passwd", "ok/../../escape.txt"] {
        let err = manifest.insert(bad, regular(b"x")).unwrap_err();
        assert!(matches!(err, PackError::UnsafePath { .. }), "path {bad:?} must be rejected");
    }
    assert!(manifest.is_empty());
}

#[test]
fn returned_manifest_describes_the_written_tree() {
    let mut manifest = FileManifest::new();
    manifest.insert("a/b/c.txt", regular(b"abc")).unwrap();
    manifest.insert("link", FileDescriptor::symlink(0o120777, "a/b/c.txt")).unwrap();

    let out = tempdir().unwrap();
    let written = write_to_disk(&manifest, out.path()).unwrap();

    assert_eq!(written.len(), 2);
    match &written.get("a/b/c.txt").unwrap().kind {
        artipack::FileKind::Regular { content } => {
            // Content now comes from the destination, not the source buffer.
            assert_eq!(content.read_all().unwrap(), b"abc");
            match content {
                ContentSource::Path(p) => assert!(p.starts_with(out.path())),
                ContentSource::Bytes(_) => panic!("expected an on-disk content source"),
            }
        }
        _ => panic!("expected a regular entry"),
    }
}

#[test]
fn cancelled_write_reports_cancellation() {
    let mut manifest = FileManifest::new();
    for i in 0..32 {
        manifest.insert(format!("f{i}.txt"), regular(b"data")).unwrap();
    }

    let cancel = CancelToken::new();
    cancel.cancel();
    let options = MaterializeOptions { concurrency: 2, cancel };

    let out = tempdir().unwrap();
    let err = write_to_disk_with(&manifest, out.path(), &options).unwrap_err();
    assert!(matches!(err, PackError::Cancelled));
}

#[test]
fn missing_parents_are_created_deeply() {
    let mut manifest = FileManifest::new();
    manifest.insert("x/y/z/w/deep.txt", regular(b"deep")).unwrap();

    let out = tempdir().unwrap();
    write_to_disk(&manifest, out.path()).unwrap();
    assert_eq!(fs::read(out.path().join("x/y/z/w/deep.txt")).unwrap(), b"deep");
}
