//! Compressed blob storage for raw page bodies
//!
//! Fetched HTML is gzip-compressed on disk and addressed by a relative
//! path recorded next to the page row. The checksum is computed over the
//! raw (uncompressed) bytes so it stays comparable across compression
//! settings and can be verified after a `get`.

use crate::storage::traits::StorageResult;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Result of persisting one blob
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Path relative to the blob root
    pub path: String,
    /// Hex-encoded SHA-256 of the raw bytes
    pub checksum: String,
    pub size_bytes: u64,
    pub compressed_size_bytes: u64,
}

/// Trait for blob storage backends
pub trait BlobStore {
    /// Persists `bytes` under the caller-chosen key
    ///
    /// The key is a relative path stem. The store appends its own
    /// extension and may create intermediate directories.
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<StoredBlob>;

    /// Reads a blob back by the path returned from `put`
    fn get(&self, path: &str) -> StorageResult<Vec<u8>>;
}

/// Filesystem-backed blob store
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates a blob store rooted at `root`, creating the directory if needed
    pub fn new(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<StoredBlob> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let checksum = hex::encode(hasher.finalize());

        let rel = format!("{}.html.gz", key);
        let full = self.root.join(&rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes)?;
        let compressed = encoder.finish()?;
        fs::write(&full, &compressed)?;

        Ok(StoredBlob {
            path: rel,
            checksum,
            size_bytes: bytes.len() as u64,
            compressed_size_bytes: compressed.len() as u64,
        })
    }

    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.root.join(path);
        let compressed = fs::read(&full)?;

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
