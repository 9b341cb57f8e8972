use crate::checksum::ChecksumProvider;
use crate::classifier::{ContentClassifier, SniffingClassifier};
use crate::diff_render::DiffRenderer;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use pkgdiff_common::{Classification, EntryKind, Finding, FindingKind, ReportMode, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Recursive tree comparison engine
///
/// Walks the baseline tree depth-first in lexical order, matches each entry
/// against the same relative path under the local root, and records one
/// [`Finding`] per discrepancy. Local-only extras are never reported. The
/// walk reads both trees and writes nothing.
pub struct TreeComparator {
    classifier: Box<dyn ContentClassifier>,
    renderer: DiffRenderer,
    ignore: Option<Gitignore>,
}

impl TreeComparator {
    pub fn new() -> Self {
        Self {
            classifier: Box::new(SniffingClassifier::new()),
            renderer: DiffRenderer::new(),
            ignore: None,
        }
    }

    /// Swap in a canned classifier (used by tests)
    pub fn with_classifier(mut self, classifier: Box<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_renderer(mut self, renderer: DiffRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Apply gitignore-style patterns to baseline traversal
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Self {
        self.ignore = build_ignore(patterns);
        self
    }

    /// Compare with the report mode supplied as text; the mode is validated
    /// before any filesystem access
    pub fn compare_str(
        &self,
        name: &str,
        baseline_root: &Path,
        local_root: &Path,
        mode: &str,
    ) -> Result<Vec<Finding>> {
        let mode: ReportMode = mode.parse()?;
        self.compare(name, baseline_root, local_root, mode)
    }

    /// Compare the local tree against the baseline tree
    ///
    /// Fails only when the baseline root itself cannot be enumerated;
    /// everything below that surfaces as findings.
    pub fn compare(
        &self,
        name: &str,
        baseline_root: &Path,
        local_root: &Path,
        mode: ReportMode,
    ) -> Result<Vec<Finding>> {
        debug!(
            "[{}] comparing baseline {:?} against local {:?} ({} report)",
            name, baseline_root, local_root, mode
        );

        let mut pass = Pass {
            comparator: self,
            mode,
            checksums: ChecksumProvider::new(),
            classifications: HashMap::new(),
            findings: Vec::new(),
        };
        pass.walk_dir(baseline_root, local_root, Path::new(""))?;

        debug!("[{}] produced {} findings", name, pass.findings.len());
        Ok(pass.findings)
    }
}

impl Default for TreeComparator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_ignore(patterns: &[String]) -> Option<Gitignore> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GitignoreBuilder::new("");
    for pattern in patterns {
        if let Err(err) = builder.add_line(None, pattern) {
            warn!("Skipping unparsable ignore pattern '{}': {}", pattern, err);
        }
    }

    match builder.build() {
        Ok(ignore) => Some(ignore),
        Err(err) => {
            warn!("Failed to build ignore matcher: {}", err);
            None
        }
    }
}

/// State owned by a single comparison call: the checksum and classification
/// memos live and die with the pass
struct Pass<'a> {
    comparator: &'a TreeComparator,
    mode: ReportMode,
    checksums: ChecksumProvider,
    classifications: HashMap<PathBuf, Classification>,
    findings: Vec<Finding>,
}

impl Pass<'_> {
    /// One directory level, lexically ordered for reproducible output
    fn walk_dir(&mut self, baseline_dir: &Path, local_dir: &Path, relative: &Path) -> Result<()> {
        let mut entries: Vec<(OsString, bool)> = Vec::new();
        for entry in fs::read_dir(baseline_dir)? {
            match entry {
                Ok(entry) => {
                    let dir_hint = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                    entries.push((entry.file_name(), dir_hint));
                }
                Err(err) => {
                    warn!("Unreadable entry under {:?}: {}", baseline_dir, err);
                }
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, dir_hint) in entries {
            let rel = relative.join(&name);

            if self.ignored(&rel, dir_hint) {
                debug!("Ignoring {:?}", rel);
                continue;
            }

            let baseline_path = baseline_dir.join(&name);
            let local_path = local_dir.join(&name);

            // metadata() follows symlinks, so a link counts as its target's
            // kind; a dangling link lands in the Unreadable arm
            let baseline_meta = match fs::metadata(&baseline_path) {
                Ok(meta) => meta,
                Err(err) => {
                    warn!("Cannot stat baseline entry {:?}: {}", baseline_path, err);
                    self.push(rel, FindingKind::Unreadable, None, None);
                    continue;
                }
            };
            let baseline_kind = EntryKind::of(&baseline_meta);

            let local_meta = match fs::metadata(&local_path) {
                Ok(meta) => Some(meta),
                Err(err) if err.kind() == io::ErrorKind::NotFound => None,
                Err(err) => {
                    warn!("Cannot stat local entry {:?}: {}", local_path, err);
                    None
                }
            };

            let Some(local_meta) = local_meta else {
                self.push(rel, FindingKind::Missing, Some(baseline_kind), None);
                continue;
            };
            let local_kind = EntryKind::of(&local_meta);

            if baseline_kind != local_kind {
                // A kind mismatch stops the descent into this subtree
                self.push(
                    rel,
                    FindingKind::TypeMismatch,
                    Some(baseline_kind),
                    Some(local_kind),
                );
                continue;
            }

            match baseline_kind {
                EntryKind::Directory => {
                    if let Err(err) = self.walk_dir(&baseline_path, &local_path, &rel) {
                        warn!("Cannot traverse {:?}: {}", baseline_path, err);
                        self.push(
                            rel,
                            FindingKind::Unreadable,
                            Some(baseline_kind),
                            Some(local_kind),
                        );
                    }
                }
                EntryKind::File => self.compare_file(&baseline_path, &local_path, rel),
            }
        }

        Ok(())
    }

    fn compare_file(&mut self, baseline_path: &Path, local_path: &Path, rel: PathBuf) {
        let baseline_hash = match self.checksums.checksum(baseline_path) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("Cannot hash baseline file {:?}: {}", baseline_path, err);
                self.push(rel, FindingKind::Unreadable, Some(EntryKind::File), None);
                return;
            }
        };
        let local_hash = match self.checksums.checksum(local_path) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("Cannot hash local file {:?}: {}", local_path, err);
                self.push(
                    rel,
                    FindingKind::Unreadable,
                    Some(EntryKind::File),
                    Some(EntryKind::File),
                );
                return;
            }
        };

        if baseline_hash == local_hash {
            self.push(
                rel,
                FindingKind::ContentMatch,
                Some(EntryKind::File),
                Some(EntryKind::File),
            );
            return;
        }

        let classification = self.classify(local_path);
        if self.mode == ReportMode::Unified && classification == Classification::Text {
            if let Some(body) = self.render_text_diff(baseline_path, local_path) {
                if body.is_empty() {
                    // Only whitespace moved; not a content difference
                    debug!("Whitespace-only difference at {:?}", rel);
                    return;
                }
                self.findings.push(Finding {
                    relative_path: rel,
                    kind: FindingKind::ContentMismatch,
                    baseline_kind: Some(EntryKind::File),
                    local_kind: Some(EntryKind::File),
                    rendered_diff: Some(body),
                });
                return;
            }
        }

        self.push(
            rel,
            FindingKind::ContentMismatch,
            Some(EntryKind::File),
            Some(EntryKind::File),
        );
    }

    fn classify(&mut self, path: &Path) -> Classification {
        if let Some(classification) = self.classifications.get(path) {
            return *classification;
        }

        let classification = match self.comparator.classifier.classify(path) {
            Ok(classification) => classification,
            Err(err) => {
                // Unreadable content falls back to the terse report path
                debug!("Cannot classify {:?}: {}", path, err);
                Classification::Binary
            }
        };
        self.classifications.insert(path.to_path_buf(), classification);
        classification
    }

    fn render_text_diff(&self, baseline_path: &Path, local_path: &Path) -> Option<String> {
        let old = fs::read(baseline_path).ok()?;
        let new = fs::read(local_path).ok()?;
        let old = String::from_utf8_lossy(&old);
        let new = String::from_utf8_lossy(&new);
        Some(self.comparator.renderer.render(&old, &new))
    }

    fn ignored(&self, rel: &Path, is_dir: bool) -> bool {
        match &self.comparator.ignore {
            Some(ignore) => ignore.matched(rel, is_dir).is_ignore(),
            None => false,
        }
    }

    fn push(
        &mut self,
        relative_path: PathBuf,
        kind: FindingKind,
        baseline_kind: Option<EntryKind>,
        local_kind: Option<EntryKind>,
    ) {
        self.findings.push(Finding {
            relative_path,
            kind,
            baseline_kind,
            local_kind,
            rendered_diff: None,
        });
    }
}
