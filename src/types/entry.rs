//! FileEntry and Digest - one file in an inventory

use std::fmt;
use std::path::PathBuf;

/// 32-byte BLAKE3 content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 chars)
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

/// Represents a file in an inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative path from tree root
    pub path: PathBuf,

    /// File size in bytes (at scan time)
    pub size: u64,

    /// Content digest; `None` until the hash pool fills it in
    pub digest: Option<Digest>,

    /// Entry was reached through a symlink to a regular file
    pub via_symlink: bool,
}

impl FileEntry {
    /// Create an entry with an unset digest
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            digest: None,
            via_symlink: false,
        }
    }

    /// Create an entry for a symlink that resolves to a regular file
    pub fn new_linked(path: PathBuf, size: u64) -> Self {
        Self {
            via_symlink: true,
            ..Self::new(path, size)
        }
    }

    /// Set the digest for this entry
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_has_unset_digest() {
        let entry = FileEntry::new(PathBuf::from("dir/file.txt"), 1024);

        assert_eq!(entry.path, PathBuf::from("dir/file.txt"));
        assert_eq!(entry.size, 1024);
        assert!(!entry.has_digest());
        assert!(!entry.via_symlink);
    }

    #[test]
    fn test_linked_entry() {
        let entry = FileEntry::new_linked(PathBuf::from("link.txt"), 7);
        assert!(entry.via_symlink);
        assert!(!entry.has_digest());
    }

    #[test]
    fn test_with_digest() {
        let digest = Digest::from_bytes([42u8; 32]);
        let entry = FileEntry::new(PathBuf::from("a"), 1).with_digest(digest);

        assert_eq!(entry.digest, Some(digest));
        assert!(entry.has_digest());
    }

    #[test]
    fn test_digest_hex_is_64_lowercase_chars() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        bytes[31] = 0x01;
        let hex = Digest::from_bytes(bytes).to_hex();

        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
        assert_eq!(hex, hex.to_lowercase());
    }

    #[test]
    fn test_digest_hex_matches_blake3() {
        let hash = blake3::hash(b"dirmirror");
        let digest = Digest::from_bytes(*hash.as_bytes());
        assert_eq!(digest.to_hex(), hash.to_hex().as_str());
        assert_eq!(digest.to_string(), hash.to_string());
    }

    #[test]
    fn test_digest_debug_is_abbreviated() {
        let digest = Digest::from_bytes([0xff; 32]);
        assert_eq!(format!("{:?}", digest), "Digest(ffffffffffff)");
    }
}
