use crate::PkgDiffError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of a filesystem entry discovered under a tree root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn of(metadata: &std::fs::Metadata) -> Self {
        if metadata.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

/// Report format for content mismatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// One-line warnings only
    #[default]
    Simple,
    /// Line-level unified diffs for text files
    Unified,
}

impl FromStr for ReportMode {
    type Err = PkgDiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "unified" => Ok(Self::Unified),
            other => Err(PkgDiffError::InvalidReportMode(other.to_string())),
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Unified => f.write_str("unified"),
        }
    }
}

/// Text/binary determination derived from a file's bytes, never its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Text,
    Binary,
}

/// BLAKE3 content digest (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Kind of discrepancy recorded for one baseline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Baseline entry has no counterpart under the local root
    Missing,
    /// Baseline and local disagree on file-vs-directory
    TypeMismatch,
    /// Both sides are files and their checksums differ
    ContentMismatch,
    /// Both sides are files with equal checksums
    ContentMatch,
    /// The entry could not be read (permission error, dangling symlink)
    Unreadable,
}

/// One comparison result for a single path, relative to both tree roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub relative_path: PathBuf,
    pub kind: FindingKind,
    pub baseline_kind: Option<EntryKind>,
    pub local_kind: Option<EntryKind>,
    /// Unified hunks, present only for text content mismatches in unified mode
    pub rendered_diff: Option<String>,
}

impl Finding {
    /// True for findings the reporter actually prints
    pub fn is_mismatch(&self) -> bool {
        !matches!(self.kind, FindingKind::ContentMatch)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Report mode used when the command line does not specify one
    #[serde(default)]
    pub default_report: Option<String>,

    /// Ignore patterns applied to baseline traversal (e.g., "*.log", ".git/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Context lines around each diff hunk
    #[serde(default)]
    pub context_lines: Option<usize>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}
