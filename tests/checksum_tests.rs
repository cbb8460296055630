//! Content hashing tests
//!
//! Tests for BLAKE3 content hashing and digest-based comparison

use dirmirror::diff::generate_sync_plan;
use dirmirror::executor::HashPool;
use dirmirror::hash::{compute_hash, HASH_CHUNK_SIZE};
use dirmirror::scanner::{scan_directory, TreeRole};
use dirmirror::types::MirrorError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn create_temp_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

#[test]
fn test_compute_hash_basic() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = create_temp_file(&temp_dir, "test.txt", b"Hello, World!");

    let digest = compute_hash(&file_path).expect("hash should succeed");

    assert_eq!(digest.as_bytes(), blake3::hash(b"Hello, World!").as_bytes());
    assert_eq!(digest.to_hex().len(), 64);
}

#[test]
fn test_compute_hash_deterministic() {
    let temp_dir = tempfile::tempdir().unwrap();
    let a = create_temp_file(&temp_dir, "a.txt", b"same bytes");
    let b = create_temp_file(&temp_dir, "b.txt", b"same bytes");

    assert_eq!(compute_hash(&a).unwrap(), compute_hash(&b).unwrap());
    assert_eq!(compute_hash(&a).unwrap(), compute_hash(&a).unwrap());
}

#[test]
fn test_compute_hash_different_content() {
    let temp_dir = tempfile::tempdir().unwrap();
    let a = create_temp_file(&temp_dir, "a.txt", b"content one");
    let b = create_temp_file(&temp_dir, "b.txt", b"content two");

    assert_ne!(compute_hash(&a).unwrap(), compute_hash(&b).unwrap());
}

#[test]
fn test_compute_hash_empty_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let file_path = create_temp_file(&temp_dir, "empty.txt", b"");

    let digest = compute_hash(&file_path).unwrap();
    assert_eq!(digest.as_bytes(), blake3::hash(b"").as_bytes());
}

#[test]
fn test_compute_hash_large_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    // Not a multiple of the chunk size, so the last read is short.
    let content: Vec<u8> = (0..HASH_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
    let file_path = create_temp_file(&temp_dir, "large.bin", &content);

    let digest = compute_hash(&file_path).unwrap();
    assert_eq!(digest.as_bytes(), blake3::hash(&content).as_bytes());
}

#[test]
fn test_compute_hash_nonexistent_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.txt");

    let err = compute_hash(&missing).unwrap_err();
    assert!(matches!(err, MirrorError::Hash { ref path, .. } if path == &missing));
}

#[test]
fn test_same_size_different_content_is_update() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    create_temp_file(&src, "file.txt", b"aaaa");
    create_temp_file(&dst, "file.txt", b"bbbb");

    let pool = HashPool::new(2).unwrap();
    let mut src_tree = scan_directory(src.path(), TreeRole::Source).unwrap();
    let mut dst_tree = scan_directory(dst.path(), TreeRole::Replica).unwrap();
    pool.hash_tree(&mut src_tree).unwrap();
    pool.hash_tree(&mut dst_tree).unwrap();

    let plan = generate_sync_plan(&src_tree, &dst_tree).unwrap();
    assert_eq!(plan.stats.update_count, 1);
    assert_eq!(plan.stats.unchanged_count, 0);
}

#[test]
fn test_identical_content_with_different_mtime_is_unchanged() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    create_temp_file(&src, "file.txt", b"identical");
    let replica_file = create_temp_file(&dst, "file.txt", b"identical");
    filetime::set_file_mtime(&replica_file, filetime::FileTime::from_unix_time(1_000, 0))
        .expect("Failed to set mtime");

    let pool = HashPool::new(2).unwrap();
    let mut src_tree = scan_directory(src.path(), TreeRole::Source).unwrap();
    let mut dst_tree = scan_directory(dst.path(), TreeRole::Replica).unwrap();
    pool.hash_tree(&mut src_tree).unwrap();
    pool.hash_tree(&mut dst_tree).unwrap();

    let plan = generate_sync_plan(&src_tree, &dst_tree).unwrap();
    assert_eq!(plan.stats.unchanged_count, 1);
    assert!(plan.is_noop());
}
