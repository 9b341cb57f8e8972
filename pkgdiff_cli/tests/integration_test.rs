use std::fs;
#[cfg(unix)]
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper struct to manage baseline and local test trees
struct TestFixture {
    _temp_dir: TempDir,
    baseline_dir: PathBuf,
    local_dir: PathBuf,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let baseline_dir = temp_dir.path().join("baseline");
        let local_dir = temp_dir.path().join("local");

        fs::create_dir(&baseline_dir).expect("Failed to create baseline dir");
        fs::create_dir(&local_dir).expect("Failed to create local dir");

        TestFixture {
            _temp_dir: temp_dir,
            baseline_dir,
            local_dir,
        }
    }

    fn create_baseline_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> PathBuf {
        self.create_file(&self.baseline_dir, path, content)
    }

    fn create_local_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> PathBuf {
        self.create_file(&self.local_dir, path, content)
    }

    fn create_file<P: AsRef<Path>>(&self, base: &Path, path: P, content: &[u8]) -> PathBuf {
        let file_path = base.join(path.as_ref());
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    fn baseline(&self) -> &Path {
        &self.baseline_dir
    }

    fn local(&self) -> &Path {
        &self.local_dir
    }
}

/// Run the CLI binary with an isolated config environment
fn run_cli(args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_pkgdiff_cli");
    let config_dir = TempDir::new().expect("Failed to create config dir");
    Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("APPDATA", config_dir.path())
        .env("HOME", config_dir.path())
        .output()
        .expect("Failed to execute command")
}

fn run_cli_success(args: &[&str]) -> std::process::Output {
    let output = run_cli(args);
    if !output.status.success() {
        eprintln!("STDOUT:\n{}", String::from_utf8_lossy(&output.stdout));
        eprintln!("STDERR:\n{}", String::from_utf8_lossy(&output.stderr));
        panic!("Command failed with status: {}", output.status);
    }
    output
}

fn diff_args<'a>(fixture: &'a TestFixture, extra: &[&'a str]) -> Vec<String> {
    let mut args = vec![
        "diff".to_string(),
        fixture.baseline().to_str().unwrap().to_string(),
        fixture.local().to_str().unwrap().to_string(),
        "--name".to_string(),
        "pkg".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args
}

fn run_diff(fixture: &TestFixture, extra: &[&str]) -> std::process::Output {
    let args = diff_args(fixture, extra);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_cli_success(&refs)
}

#[test]
fn test_identical_trees_report_nothing() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("hello.php", b"<?php\necho 'hi';\n");
    fixture.create_local_file("hello.php", b"<?php\necho 'hi';\n");
    fixture.create_baseline_file("inc/util.php", b"<?php\n");
    fixture.create_local_file("inc/util.php", b"<?php\n");

    let output = run_diff(&fixture, &[]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
}

#[test]
fn test_missing_file_is_reported() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("gone.txt", b"data\n");

    let output = run_diff(&fixture, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let expected = format!(
        "[pkg] Missing: {}\n",
        fixture.local().join("gone.txt").display()
    );
    assert_eq!(stdout, expected);
}

#[test]
fn test_type_mismatch_wording() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("assets/logo.txt", b"logo\n");
    fixture.create_local_file("assets", b"not a directory\n");

    let output = run_diff(&fixture, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("[pkg] Should be a directory:"));
    // The subtree beneath the mismatch is not traversed
    assert!(!stdout.contains("logo.txt"));
}

#[test]
fn test_simple_mode_reports_checksum_mismatch() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("file.txt", b"a\nb\nc\n");
    fixture.create_local_file("file.txt", b"a\nB\nc\n");

    let output = run_diff(&fixture, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("[pkg] Checksums do not match:"));
    assert!(!stdout.contains("---"));
}

#[test]
fn test_unified_mode_renders_text_diff() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("file.txt", b"a\nb\nc\n");
    fixture.create_local_file("file.txt", b"a\nB\nc\n");

    let output = run_diff(&fixture, &["--report", "unified"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains(&format!(
        "--- [pkg] {}\n",
        fixture.baseline().join("file.txt").display()
    )));
    assert!(stdout.contains(&format!(
        "+++ [pkg] {}\n",
        fixture.local().join("file.txt").display()
    )));
    assert!(stdout.contains("-b\n"));
    assert!(stdout.contains("+B\n"));
    assert!(stdout.contains("@@"));
    // Piped output carries no ANSI escapes
    assert!(!stdout.contains("\x1b["));
}

#[test]
fn test_unified_mode_ignores_whitespace_only_changes() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("file.txt", b"a\nb\nc\n");
    fixture.create_local_file("file.txt", b"a\nb   \nc\n");

    let output = run_diff(&fixture, &["--report", "unified"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
}

#[test]
fn test_binary_mismatch_stays_terse_in_unified_mode() {
    let fixture = TestFixture::new();
    let small: Vec<u8> = (0..=255).collect();
    let mut large = small.clone();
    large.extend_from_slice(&small);
    fixture.create_baseline_file("image.bin", &small);
    fixture.create_local_file("image.bin", &large);

    let output = run_diff(&fixture, &["--report", "unified"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("[pkg] Checksums do not match:"));
    assert!(!stdout.contains("---"));
    assert!(!stdout.contains("@@"));
}

#[test]
fn test_invalid_report_mode_fails() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("file.txt", b"data\n");
    fixture.create_local_file("file.txt", b"data\n");

    let args = diff_args(&fixture, &["--report", "xml"]);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_cli(&refs);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid report type"));
}

#[test]
fn test_invalid_report_mode_wins_over_bad_paths() {
    // Mode validation fires before the roots are ever inspected
    let output = run_cli(&[
        "diff",
        "/does/not/exist",
        "/also/absent",
        "--report",
        "xml",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid report type"));
    assert!(!stderr.contains("not a directory"));
}

#[test]
fn test_nonexistent_baseline_fails() {
    let fixture = TestFixture::new();
    let output = run_cli(&[
        "diff",
        "/does/not/exist",
        fixture.local().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Baseline path is not a directory"));
}

#[test]
fn test_findings_still_exit_zero() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("gone.txt", b"data\n");

    // Findings are reported, not treated as a fatal error
    let output = run_diff(&fixture, &[]);
    assert!(output.status.success());
}

#[test]
fn test_default_name_comes_from_baseline_dir() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("gone.txt", b"data\n");

    let output = run_cli_success(&[
        "diff",
        fixture.baseline().to_str().unwrap(),
        fixture.local().to_str().unwrap(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("[baseline] Missing:"));
}

#[test]
fn test_ignore_patterns_suppress_findings() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("kept.txt", b"data\n");
    fixture.create_baseline_file("noise.log", b"data\n");
    fixture.create_local_file("kept.txt", b"data\n");

    let output = run_diff(&fixture, &["--ignore", "*.log"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
}

#[test]
fn test_json_output() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("same.txt", b"same\n");
    fixture.create_local_file("same.txt", b"same\n");
    fixture.create_baseline_file("changed.txt", b"a\nb\nc\n");
    fixture.create_local_file("changed.txt", b"a\nB\nc\n");

    let output = run_diff(&fixture, &["--report", "unified", "--json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");

    assert_eq!(json["package"], "pkg");
    assert_eq!(json["summary"]["matched"], 1);
    assert_eq!(json["summary"]["content_mismatches"], 1);

    let findings = json["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["path"], "changed.txt");
    assert_eq!(findings[0]["kind"], "content_mismatch");
    assert!(findings[0]["diff"].as_str().unwrap().contains("+B"));
}

#[test]
fn test_nested_missing_paths_are_ordered() {
    let fixture = TestFixture::new();
    fixture.create_baseline_file("b.txt", b"data\n");
    fixture.create_baseline_file("a/deep.txt", b"data\n");
    fixture.create_local_file("noise.txt", b"local extra, never reported\n");

    let output = run_diff(&fixture, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    // Lexical order: the directory "a" sorts before "b.txt"
    assert!(lines[0].ends_with(&format!("{}", fixture.local().join("a").display())));
    assert!(lines[1].ends_with(&format!("{}", fixture.local().join("b.txt").display())));
    // Local-only extras are never reported
    assert!(!stdout.contains("noise.txt"));
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_reported_unreadable() {
    let fixture = TestFixture::new();
    unix_fs::symlink("/nowhere/at/all", fixture.baseline().join("broken"))
        .expect("Failed to create symlink");
    fixture.create_baseline_file("ok.txt", b"data\n");
    fixture.create_local_file("ok.txt", b"data\n");

    let output = run_diff(&fixture, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("[pkg] Unreadable:"));
    assert!(!stdout.contains("ok.txt"));
}

fn write_manifest(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("manifest.toml");
    fs::write(&path, body).expect("Failed to write manifest");
    path
}

#[test]
fn test_batch_compares_all_packages() {
    let fixture = TestFixture::new();
    let base = fixture._temp_dir.path();

    fixture.create_file(base, "ref/one/file.txt", b"data\n");
    fixture.create_file(base, "inst/one/file.txt", b"data\n");
    fixture.create_file(base, "ref/two/file.txt", b"data\n");
    fixture.create_file(base, "inst/two/other.txt", b"data\n");

    let manifest = write_manifest(
        base,
        &format!(
            r#"
            [[package]]
            name = "one"
            baseline = "{0}/ref/one"
            local = "{0}/inst/one"

            [[package]]
            name = "two"
            baseline = "{0}/ref/two"
            local = "{0}/inst/two"
            "#,
            base.display()
        ),
    );

    let output = run_cli_success(&["batch", manifest.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("[two] Missing:"));
    assert!(!stdout.contains("[one]"));
}

#[test]
fn test_batch_continues_past_acquisition_failure() {
    let fixture = TestFixture::new();
    let base = fixture._temp_dir.path();

    fixture.create_file(base, "inst/ghost/file.txt", b"data\n");
    fixture.create_file(base, "ref/ok/file.txt", b"old\n");
    fixture.create_file(base, "inst/ok/file.txt", b"new\n");

    let manifest = write_manifest(
        base,
        &format!(
            r#"
            [[package]]
            name = "ghost"
            baseline = "{0}/ref/ghost"
            local = "{0}/inst/ghost"

            [[package]]
            name = "ok"
            baseline = "{0}/ref/ok"
            local = "{0}/inst/ok"
            "#,
            base.display()
        ),
    );

    // The missing baseline for "ghost" does not abort the run
    let output = run_cli_success(&["batch", manifest.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains("[ok] Checksums do not match:"));
    assert!(stderr.contains("ghost"));
}

#[test]
fn test_batch_rejects_invalid_mode() {
    let fixture = TestFixture::new();
    let base = fixture._temp_dir.path();
    let manifest = write_manifest(
        base,
        r#"
        [[package]]
        name = "one"
        baseline = "/tmp/nope"
        local = "/tmp/nope"
        "#,
    );

    let output = run_cli(&["batch", manifest.to_str().unwrap(), "--report", "xml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid report type"));
}

#[test]
fn test_batch_rejects_empty_manifest() {
    let fixture = TestFixture::new();
    let manifest = write_manifest(fixture._temp_dir.path(), "");

    let output = run_cli(&["batch", manifest.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no packages"));
}

#[test]
fn test_help_lists_subcommands() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("diff"));
    assert!(stdout.contains("batch"));
}

#[test]
fn test_version_flag() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pkgdiff"));
}
