use pkgdiff_common::{EntryKind, Finding, FindingKind};
use std::io::{self, Write};
use std::path::Path;

/// Per-run tallies of findings seen by the reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportSummary {
    pub matched: usize,
    pub missing: usize,
    pub type_mismatches: usize,
    pub content_mismatches: usize,
    pub unreadable: usize,
}

impl ReportSummary {
    /// True when the local tree matched the baseline everywhere
    pub fn clean(&self) -> bool {
        self.missing == 0
            && self.type_mismatches == 0
            && self.content_mismatches == 0
            && self.unreadable == 0
    }

    pub fn mismatch_count(&self) -> usize {
        self.missing + self.type_mismatches + self.content_mismatches + self.unreadable
    }
}

/// Writes findings as one-line warnings, or as unified diffs when a finding
/// carries a rendered body
///
/// Matches are counted but never printed, and a malformed finding never
/// aborts the run.
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    /// Emit every finding for one package and return the tallies
    pub fn report(
        &mut self,
        name: &str,
        baseline_root: &Path,
        local_root: &Path,
        findings: &[Finding],
    ) -> io::Result<ReportSummary> {
        let mut summary = ReportSummary::default();
        for finding in findings {
            self.report_one(name, baseline_root, local_root, finding, &mut summary)?;
        }
        Ok(summary)
    }

    fn report_one(
        &mut self,
        name: &str,
        baseline_root: &Path,
        local_root: &Path,
        finding: &Finding,
        summary: &mut ReportSummary,
    ) -> io::Result<()> {
        let local_path = local_root.join(&finding.relative_path);

        match finding.kind {
            FindingKind::ContentMatch => {
                summary.matched += 1;
            }
            FindingKind::Missing => {
                summary.missing += 1;
                writeln!(self.out, "[{}] Missing: {}", name, local_path.display())?;
            }
            FindingKind::TypeMismatch => {
                summary.type_mismatches += 1;
                let expected = match finding.baseline_kind {
                    Some(EntryKind::Directory) => "directory",
                    _ => "file",
                };
                writeln!(
                    self.out,
                    "[{}] Should be a {}: {}",
                    name,
                    expected,
                    local_path.display()
                )?;
            }
            FindingKind::ContentMismatch => {
                summary.content_mismatches += 1;
                match finding.rendered_diff.as_deref() {
                    Some(body) => {
                        let baseline_path = baseline_root.join(&finding.relative_path);
                        writeln!(self.out, "--- [{}] {}", name, baseline_path.display())?;
                        writeln!(self.out, "+++ [{}] {}", name, local_path.display())?;
                        self.write_diff_body(body)?;
                    }
                    None => {
                        writeln!(
                            self.out,
                            "[{}] Checksums do not match: {}",
                            name,
                            local_path.display()
                        )?;
                    }
                }
            }
            FindingKind::Unreadable => {
                summary.unreadable += 1;
                let baseline_path = baseline_root.join(&finding.relative_path);
                writeln!(
                    self.out,
                    "[{}] Unreadable: {}",
                    name,
                    baseline_path.display()
                )?;
            }
        }

        Ok(())
    }

    fn write_diff_body(&mut self, body: &str) -> io::Result<()> {
        if !self.color {
            return self.out.write_all(body.as_bytes());
        }

        for line in body.lines() {
            let (prefix, reset) = match line.bytes().next() {
                Some(b'-') => ("\x1b[31m", "\x1b[0m"), // Red
                Some(b'+') => ("\x1b[32m", "\x1b[0m"), // Green
                Some(b'@') => ("\x1b[36m", "\x1b[0m"), // Cyan
                _ => ("", ""),
            };
            writeln!(self.out, "{}{}{}", prefix, line, reset)?;
        }
        Ok(())
    }
}
