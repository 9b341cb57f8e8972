use clap::{Parser, Subcommand};
use pkgdiff_common::{load_config, Finding, FindingKind, PkgDiffError, ReportMode};
use pkgdiff_core::diff_render::DiffRenderer;
use pkgdiff_core::{
    BaselineAcquirer, InstalledPackage, PackageResolver, Reporter, TempScratch, TreeComparator,
    Verifier, VersionSpec,
};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkgdiff")]
#[command(author = "PkgDiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Detect local modifications of a package against a reference copy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a local tree against a baseline reference tree
    Diff {
        /// Baseline (reference) directory
        baseline: PathBuf,

        /// Local (installed) directory
        local: PathBuf,

        /// Package name used to prefix report lines
        #[arg(short, long)]
        name: Option<String>,

        /// Report to produce: "simple" or "unified"
        #[arg(short, long)]
        report: Option<String>,

        /// Ignore patterns (can be specified multiple times)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Context lines around each diff hunk
        #[arg(long)]
        context: Option<usize>,

        /// Output findings as JSON
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output
        #[arg(long)]
        no_color: bool,
    },

    /// Verify every package in a TOML manifest, continuing past failures
    Batch {
        /// Manifest listing packages with their baseline and local roots
        manifest: PathBuf,

        /// Report to produce: "simple" or "unified"
        #[arg(short, long)]
        report: Option<String>,

        /// Disable ANSI colors in output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() {
    // Log to stderr so report output on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Diff {
            baseline,
            local,
            name,
            report,
            ignore,
            context,
            json,
            no_color,
        } => run_diff(baseline, local, name, report, ignore, context, json, no_color),
        Commands::Batch {
            manifest,
            report,
            no_color,
        } => run_batch(manifest, report, no_color),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run_diff(
    baseline: PathBuf,
    local: PathBuf,
    name: Option<String>,
    report: Option<String>,
    ignore: Vec<String>,
    context: Option<usize>,
    json: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let loaded = load_config(false)?;
    let config = loaded.config;

    // Mode validation comes first, before either root is touched
    let report = report
        .or(config.default_report)
        .unwrap_or_else(|| ReportMode::default().to_string());
    let mode: ReportMode = report.parse()?;

    if !baseline.is_dir() {
        anyhow::bail!("Baseline path is not a directory: {}", baseline.display());
    }
    if !local.is_dir() {
        anyhow::bail!("Local path is not a directory: {}", local.display());
    }

    let name = name.unwrap_or_else(|| {
        baseline
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string())
    });

    let mut ignore_patterns = config.ignore_patterns;
    ignore_patterns.extend(ignore);

    let context = context
        .or(config.context_lines)
        .unwrap_or(pkgdiff_core::diff_render::DEFAULT_CONTEXT_LINES);

    let comparator = TreeComparator::new()
        .with_renderer(DiffRenderer::with_context(context))
        .with_ignore_patterns(&ignore_patterns);

    info!(
        "[{}] comparing baseline {} against local {}",
        name,
        baseline.display(),
        local.display()
    );

    let findings = comparator.compare(&name, &baseline, &local, mode)?;

    if json {
        let report = build_json_report(&name, &baseline, &local, &findings);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stdout = std::io::stdout();
    let use_color = !no_color && stdout.is_terminal();
    let mut reporter = Reporter::new(stdout.lock()).with_color(use_color);
    let summary = reporter.report(&name, &baseline, &local, &findings)?;

    if summary.clean() {
        info!("[{}] local copy matches the baseline", name);
    } else {
        info!("[{}] {} findings reported", name, summary.mismatch_count());
    }

    Ok(())
}

fn run_batch(manifest: PathBuf, report: Option<String>, no_color: bool) -> anyhow::Result<()> {
    let loaded = load_config(false)?;
    let config = loaded.config;

    let report = report
        .or(config.default_report)
        .unwrap_or_else(|| ReportMode::default().to_string());

    let manifest = load_manifest(&manifest)?;
    if manifest.packages.is_empty() {
        anyhow::bail!("Manifest lists no packages");
    }

    let resolver = ManifestResolver {
        packages: &manifest.packages,
    };
    let acquirer = ManifestAcquirer {
        packages: &manifest.packages,
    };
    let scratch = TempScratch;
    let comparator = TreeComparator::new().with_ignore_patterns(&config.ignore_patterns);

    let stdout = std::io::stdout();
    let use_color = !no_color && stdout.is_terminal();
    let mut reporter = Reporter::new(stdout.lock()).with_color(use_color);

    let outcomes = Verifier::new(&resolver, &acquirer, &scratch, &comparator, &mut reporter)
        .verify_all(&report)?;

    let clean = outcomes.iter().filter(|o| o.summary.clean()).count();
    info!(
        "Verified {} of {} packages; {} unmodified",
        outcomes.len(),
        manifest.packages.len(),
        clean
    );

    Ok(())
}

/// Batch manifest: a list of `[[package]]` tables
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "package")]
    packages: Vec<ManifestPackage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestPackage {
    name: String,
    baseline: PathBuf,
    local: PathBuf,
    #[serde(default)]
    version: Option<String>,
}

fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read manifest {}: {}", path.display(), e))?;
    let manifest = toml::from_str(&data)
        .map_err(|e| anyhow::anyhow!("Invalid manifest {}: {}", path.display(), e))?;
    Ok(manifest)
}

/// Resolves package names against the manifest instead of a registry
struct ManifestResolver<'a> {
    packages: &'a [ManifestPackage],
}

impl ManifestResolver<'_> {
    fn find(&self, name: &str) -> Option<&ManifestPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl PackageResolver for ManifestResolver<'_> {
    fn resolve(&self, name: &str) -> pkgdiff_common::Result<InstalledPackage> {
        let package = self
            .find(name)
            .ok_or_else(|| PkgDiffError::Resolve(name.to_string()))?;
        Ok(InstalledPackage {
            name: package.name.clone(),
            version: package
                .version
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            root: package.local.clone(),
        })
    }

    fn installed(&self) -> pkgdiff_common::Result<Vec<InstalledPackage>> {
        self.packages.iter().map(|p| self.resolve(&p.name)).collect()
    }
}

/// Hands out the manifest's pre-unpacked baseline trees
struct ManifestAcquirer<'a> {
    packages: &'a [ManifestPackage],
}

impl BaselineAcquirer for ManifestAcquirer<'_> {
    fn acquire(
        &self,
        name: &str,
        _version: &VersionSpec,
        _scratch: &Path,
    ) -> pkgdiff_common::Result<PathBuf> {
        let package = self
            .packages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PkgDiffError::Acquisition(format!("no baseline listed for {}", name)))?;

        if !package.baseline.is_dir() {
            return Err(PkgDiffError::Acquisition(format!(
                "baseline for {} is not a directory: {}",
                name,
                package.baseline.display()
            )));
        }
        Ok(package.baseline.clone())
    }
}

#[derive(Serialize)]
struct JsonReport {
    package: String,
    baseline: String,
    local: String,
    summary: JsonSummary,
    findings: Vec<JsonFinding>,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    matched: usize,
    missing: usize,
    type_mismatches: usize,
    content_mismatches: usize,
    unreadable: usize,
}

#[derive(Serialize)]
struct JsonFinding {
    path: String,
    kind: FindingKind,
    diff: Option<String>,
}

fn build_json_report(
    name: &str,
    baseline: &Path,
    local: &Path,
    findings: &[Finding],
) -> JsonReport {
    let mut summary = JsonSummary {
        total: findings.len(),
        matched: 0,
        missing: 0,
        type_mismatches: 0,
        content_mismatches: 0,
        unreadable: 0,
    };

    let mut entries = Vec::new();
    for finding in findings {
        match finding.kind {
            FindingKind::ContentMatch => {
                summary.matched += 1;
                continue;
            }
            FindingKind::Missing => summary.missing += 1,
            FindingKind::TypeMismatch => summary.type_mismatches += 1,
            FindingKind::ContentMismatch => summary.content_mismatches += 1,
            FindingKind::Unreadable => summary.unreadable += 1,
        }

        entries.push(JsonFinding {
            path: finding.relative_path.to_string_lossy().into_owned(),
            kind: finding.kind,
            diff: finding.rendered_diff.clone(),
        });
    }

    JsonReport {
        package: name.to_string(),
        baseline: baseline.to_string_lossy().into_owned(),
        local: local.to_string_lossy().into_owned(),
        summary,
        findings: entries,
    }
}
