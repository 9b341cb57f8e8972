use pkgdiff_common::{Classification, Result};
use std::io::Read;
use std::path::Path;

/// How many bytes to sniff from the head of a file
const SNIFF_LEN: usize = 8 * 1024;

/// Determines whether a file's content is text or binary
///
/// Kept behind a trait so the comparator can be exercised with a canned
/// classifier in tests.
pub trait ContentClassifier {
    fn classify(&self, path: &Path) -> Result<Classification>;
}

/// Classifier that sniffs a bounded prefix of the file's bytes
///
/// A NUL byte or invalid UTF-8 marks the content binary; a multi-byte
/// sequence cut off at the sniff boundary does not. Filename extensions are
/// never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingClassifier;

impl SniffingClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify raw bytes without touching the filesystem
    pub fn classify_bytes(bytes: &[u8]) -> Classification {
        if bytes.contains(&0) {
            return Classification::Binary;
        }
        match std::str::from_utf8(bytes) {
            Ok(_) => Classification::Text,
            // error_len() of None means the buffer ended mid-sequence
            Err(e) if e.error_len().is_none() => Classification::Text,
            Err(_) => Classification::Binary,
        }
    }
}

impl ContentClassifier for SniffingClassifier {
    fn classify(&self, path: &Path) -> Result<Classification> {
        let mut file = std::fs::File::open(path)?;
        let mut buffer = vec![0; SNIFF_LEN];
        let mut filled = 0;

        while filled < SNIFF_LEN {
            let n = file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);

        Ok(Self::classify_bytes(&buffer))
    }
}
