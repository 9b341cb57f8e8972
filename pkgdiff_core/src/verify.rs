use crate::comparator::TreeComparator;
use crate::reporter::{ReportSummary, Reporter};
use pkgdiff_common::{ReportMode, Result};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An installed package located by a [`PackageResolver`]
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    /// Root of the installed tree on disk
    pub root: PathBuf,
}

/// Baseline version requested for comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(String),
}

impl VersionSpec {
    pub fn parse(version: Option<&str>) -> Self {
        match version {
            Some(v) if !v.is_empty() && v != "latest" => Self::Exact(v.to_string()),
            _ => Self::Latest,
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// Locates installed packages by name
pub trait PackageResolver {
    fn resolve(&self, name: &str) -> Result<InstalledPackage>;

    /// Every installed package, for batch verification
    fn installed(&self) -> Result<Vec<InstalledPackage>>;
}

/// Produces an unpacked reference copy of a package
///
/// Implementations may download and extract an archive, or simply point at
/// a tree that already exists. The returned root must stay valid until the
/// scratch directory is removed.
pub trait BaselineAcquirer {
    fn acquire(&self, name: &str, version: &VersionSpec, scratch: &Path) -> Result<PathBuf>;
}

/// Creates and tears down scratch directories around one comparison
pub trait ScratchLifecycle {
    fn create(&self) -> Result<PathBuf>;
    fn remove(&self, path: &Path) -> Result<()>;
}

/// Scratch directories under the system temp dir
#[derive(Debug, Clone, Copy, Default)]
pub struct TempScratch;

impl ScratchLifecycle for TempScratch {
    fn create(&self) -> Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix("pkgdiff-").tempdir()?;
        Ok(dir.keep())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path)?;
        Ok(())
    }
}

/// Result of verifying one package
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub package: String,
    pub version: String,
    pub summary: ReportSummary,
}

/// Drives resolution, acquisition and comparison for whole packages
///
/// All collaborators are injected, so the callers that know about package
/// registries and downloads stay outside the comparison core.
pub struct Verifier<'a, W: Write> {
    resolver: &'a dyn PackageResolver,
    acquirer: &'a dyn BaselineAcquirer,
    scratch: &'a dyn ScratchLifecycle,
    comparator: &'a TreeComparator,
    reporter: &'a mut Reporter<W>,
}

impl<'a, W: Write> Verifier<'a, W> {
    pub fn new(
        resolver: &'a dyn PackageResolver,
        acquirer: &'a dyn BaselineAcquirer,
        scratch: &'a dyn ScratchLifecycle,
        comparator: &'a TreeComparator,
        reporter: &'a mut Reporter<W>,
    ) -> Self {
        Self {
            resolver,
            acquirer,
            scratch,
            comparator,
            reporter,
        }
    }

    /// Verify one package against its reference copy
    ///
    /// The report mode is validated before anything else runs.
    pub fn verify_package(
        &mut self,
        name: &str,
        version: Option<&str>,
        mode: &str,
    ) -> Result<VerifyOutcome> {
        let mode: ReportMode = mode.parse()?;
        let package = self.resolver.resolve(name)?;
        let requested = VersionSpec::parse(version);
        self.verify_resolved(&package, &requested, mode)
    }

    /// Verify every installed package, continuing past per-package failures
    pub fn verify_all(&mut self, mode: &str) -> Result<Vec<VerifyOutcome>> {
        let mode: ReportMode = mode.parse()?;

        let mut outcomes = Vec::new();
        for package in self.resolver.installed()? {
            match self.verify_resolved(&package, &VersionSpec::Latest, mode) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => warn!("[{}] verification failed: {}", package.name, err),
            }
        }
        Ok(outcomes)
    }

    fn verify_resolved(
        &mut self,
        package: &InstalledPackage,
        requested: &VersionSpec,
        mode: ReportMode,
    ) -> Result<VerifyOutcome> {
        let scratch_dir = self.scratch.create()?;
        let result = self.compare_in_scratch(package, requested, mode, &scratch_dir);

        // Cleanup runs on both paths; a failure here never changes the outcome
        if let Err(err) = self.scratch.remove(&scratch_dir) {
            warn!(
                "Failed to remove scratch directory {:?}: {}",
                scratch_dir, err
            );
        }

        result
    }

    fn compare_in_scratch(
        &mut self,
        package: &InstalledPackage,
        requested: &VersionSpec,
        mode: ReportMode,
        scratch_dir: &Path,
    ) -> Result<VerifyOutcome> {
        let baseline_root = self
            .acquirer
            .acquire(&package.name, requested, scratch_dir)?;

        info!(
            "[{}] comparing installed {} against {} baseline",
            package.name, package.version, requested
        );

        let findings = self
            .comparator
            .compare(&package.name, &baseline_root, &package.root, mode)?;
        let summary = self
            .reporter
            .report(&package.name, &baseline_root, &package.root, &findings)?;

        if summary.clean() {
            info!("[{}] local copy matches the baseline", package.name);
        } else {
            info!(
                "[{}] {} findings reported",
                package.name,
                summary.mismatch_count()
            );
        }

        Ok(VerifyOutcome {
            package: package.name.clone(),
            version: package.version.clone(),
            summary,
        })
    }
}
