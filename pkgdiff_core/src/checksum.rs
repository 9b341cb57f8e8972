use pkgdiff_common::{ContentHash, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;
use tracing::debug;

/// Memo key for a hashed file within one comparison pass
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Whole-file BLAKE3 checksum provider
///
/// Reads every byte of the file; two files are content-identical iff their
/// digests are equal. Digests are memoized per provider instance, keyed by
/// path, size and mtime, so a file touched by several comparisons within a
/// pass is only hashed once. Nothing is persisted to disk.
pub struct ChecksumProvider {
    memo: RwLock<HashMap<MemoKey, ContentHash>>,
}

impl ChecksumProvider {
    pub fn new() -> Self {
        Self {
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Digest the entire file content
    pub fn checksum(&self, path: &Path) -> Result<ContentHash> {
        let metadata = std::fs::metadata(path)?;
        let key = MemoKey {
            path: path.to_path_buf(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        };

        if let Some(hash) = self.get(&key) {
            debug!("Checksum memo hit for {:?}", path);
            return Ok(hash);
        }

        let mut file = std::fs::File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0; 64 * 1024]; // 64KB buffer

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let hash: ContentHash = hasher.finalize().into();
        self.put(key, hash);
        Ok(hash)
    }

    /// Compare two files by digest
    pub fn files_match(&self, left: &Path, right: &Path) -> Result<bool> {
        Ok(self.checksum(left)? == self.checksum(right)?)
    }

    fn get(&self, key: &MemoKey) -> Option<ContentHash> {
        self.memo.read().ok()?.get(key).copied()
    }

    fn put(&self, key: MemoKey, hash: ContentHash) {
        if let Ok(mut memo) = self.memo.write() {
            memo.insert(key, hash);
        }
    }
}

impl Default for ChecksumProvider {
    fn default() -> Self {
        Self::new()
    }
}
