//! Content hashing for external-modification detection
//!
//! Documents are fingerprinted with SHA-256 at save time; the stored digest
//! is compared against the live file on the next load to detect edits or
//! deletion that happened outside the editor.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::Result;
use crate::types::{ContentHash, DocumentUri};

/// Streaming read chunk size for file hashing
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Hash a byte slice
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash(hasher.finalize().into())
}

/// Hash the UTF-8 bytes of a string
pub fn hash_str(text: &str) -> ContentHash {
    hash_bytes(text.as_bytes())
}

/// Hash a file's contents without loading it whole
///
/// Returns `Ok(None)` when the file does not exist; a missing file is the
/// "deleted outside the editor" signal, not a fault. Other I/O failures
/// propagate as errors.
pub async fn hash_file(path: &Path) -> Result<Option<ContentHash>> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(ContentHash(hasher.finalize().into())))
}

/// Stable hex digest of a URI, used to name snapshot blobs on disk
pub fn uri_digest(uri: &DocumentUri) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_str().as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            hash_bytes(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_str("hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_uri_digest_is_stable() {
        let uri = DocumentUri::new("file:///tmp/a.md");
        assert_eq!(uri_digest(&uri), uri_digest(&uri));
        assert_eq!(uri_digest(&uri).len(), 64);
        assert_ne!(uri_digest(&uri), uri_digest(&DocumentUri::new("file:///tmp/b.md")));
    }

    #[tokio::test]
    async fn test_hash_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, b"session contents").await.unwrap();

        let from_file = hash_file(&path).await.unwrap().unwrap();
        assert_eq!(from_file, hash_bytes(b"session contents"));
    }

    #[tokio::test]
    async fn test_hash_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never-written.txt");
        assert_eq!(hash_file(&gone).await.unwrap(), None);
    }
}
