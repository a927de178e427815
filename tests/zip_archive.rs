#![cfg(unix)]

use std::fs;
use std::io::{Cursor, Read};
use std::os::unix::fs::symlink;
use std::path::Path;

use artipack::{build_archive, build_archive_with, collect, ArchiveOptions};
use tempfile::tempdir;

fn create_symlink_fixture(dir: &Path) {
    fs::write(dir.join("a.txt"), b"the contents of a.txt\n").unwrap();
    symlink("a.txt", dir.join("link.txt")).unwrap();
}

#[test]
fn zip_entries_carry_symlink_attributes() {
    let src = tempdir().unwrap();
    create_symlink_fixture(src.path());

    let files = collect("**", src.path()).unwrap();
    assert_eq!(files.len(), 2);

    let buffer = build_archive(&files).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
    assert_eq!(archive.len(), 2);

    {
        let mut link = archive.by_name("link.txt").unwrap();
        let mode = link.unix_mode().expect("unix attributes present");
        assert_eq!(mode & 0o170000, 0o120000, "file-type nibble must be S_IFLNK");
        // The entry data is the raw target string, not the referent's bytes.
        let mut payload = String::new();
        link.read_to_string(&mut payload).unwrap();
        assert_eq!(payload, "a.txt");
    }

    {
        let mut regular = archive.by_name("a.txt").unwrap();
        let mode = regular.unix_mode().expect("unix attributes present");
        assert_ne!(mode & 0o170000, 0o120000);
        let mut payload = Vec::new();
        regular.read_to_end(&mut payload).unwrap();
        assert_eq!(payload, b"the contents of a.txt\n");
    }
}

#[test]
fn entry_order_follows_the_manifest() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("b.txt"), b"b").unwrap();
    fs::write(src.path().join("a.txt"), b"a").unwrap();
    fs::create_dir(src.path().join("sub")).unwrap();
    fs::write(src.path().join("sub/c.txt"), b"c").unwrap();

    let files = collect("**", src.path()).unwrap();
    let manifest_order: Vec<String> = files.paths().map(str::to_string).collect();

    let buffer = build_archive(&files).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
    let archive_order: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();

    assert_eq!(manifest_order, archive_order);
}

#[test]
fn extraction_round_trips_file_content() {
    let src = tempdir().unwrap();
    fs::create_dir(src.path().join("lib")).unwrap();
    fs::write(src.path().join("lib/mod.js"), b"module.exports = 42;\n").unwrap();
    fs::write(src.path().join("index.js"), b"require('./lib/mod');\n").unwrap();

    let files = collect("**", src.path()).unwrap();
    let buffer = build_archive(&files).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
    let out = tempdir().unwrap();
    archive.extract(out.path()).unwrap();

    assert_eq!(fs::read(out.path().join("index.js")).unwrap(), b"require('./lib/mod');\n");
    assert_eq!(fs::read(out.path().join("lib/mod.js")).unwrap(), b"module.exports = 42;\n");
}

#[test]
fn oversized_manifests_are_refused() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("big.bin"), vec![0u8; 64 * 1024]).unwrap();

    let files = collect("**", src.path()).unwrap();
    let options = ArchiveOptions { max_uncompressed_size: 1024, ..Default::default() };
    let err = build_archive_with(&files, &options).unwrap_err();
    assert!(matches!(err, artipack::PackError::Encoding { .. }));
}
