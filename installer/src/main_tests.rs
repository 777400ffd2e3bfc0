//! Tests for command dispatch in the installer binary.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use formula_installer::test_utils::{ManifestBuilder, tar_gz};
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

const EXECUTABLE: &[u8] = b"#!/bin/sh\necho guilde-cli 0.44.0\n";

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    /// Write a manifest publishing 0.44.0 as a local tarball for every platform.
    fn manifest(&self) -> Utf8PathBuf {
        let tarball = tar_gz(&[("guilde-cli", EXECUTABLE)]);
        fs::create_dir_all(self.root.join("dist")).expect("create dist");
        fs::write(self.root.join("dist/guilde-cli.tar.gz"), &tarball).expect("write tarball");

        let mut builder = ManifestBuilder::new("guilde-cli");
        for platform in Platform::all() {
            builder = builder.artifact(
                "0.44.0",
                platform.os.as_str(),
                platform.arch.as_str(),
                "dist/guilde-cli.tar.gz",
                &tarball,
            );
        }
        let path = self.root.join("guilde-cli.toml");
        fs::write(&path, builder.build()).expect("write manifest");
        path
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 temp dir");
    Workspace { _dir: dir, root }
}

struct Captured {
    result: Result<()>,
    stdout: String,
    stderr: String,
}

fn run_args(args: &[&str]) -> Captured {
    let cli = Cli::parse_from(std::iter::once("formula-installer").chain(args.iter().copied()));
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = run(
        &cli,
        None,
        &mut Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
    );
    Captured {
        result,
        stdout: String::from_utf8(stdout).expect("stdout was not UTF-8"),
        stderr: String::from_utf8(stderr).expect("stderr was not UTF-8"),
    }
}

#[test]
fn exit_code_for_run_result_is_success_on_ok() {
    let mut stderr = Vec::new();
    let code = exit_code_for_run_result(Ok(()), &mut stderr);
    assert_eq!(code, 0);
    assert!(stderr.is_empty());
}

#[test]
fn exit_code_for_run_result_prints_error() {
    let err = InstallerError::from(ConfigError::MissingManifest);
    let message = err.to_string();
    let mut stderr = Vec::new();
    let code = exit_code_for_run_result(Err(err), &mut stderr);

    assert_eq!(code, 1);
    let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
    assert_eq!(text, format!("error: {message}\n"));
}

#[rstest]
#[case::quiet(0, true, "error")]
#[case::default(0, false, "warn")]
#[case::verbose(1, false, "info")]
#[case::very_verbose(2, false, "debug")]
#[case::max(5, false, "trace")]
fn verbosity_maps_to_log_level(#[case] verbosity: u8, #[case] quiet: bool, #[case] level: &str) {
    assert_eq!(default_directive(verbosity, quiet), level);
}

#[test]
fn log_environment_overrides_verbosity() {
    temp_env::with_var(LOG_ENV, Some("formula_installer=trace"), || {
        let filter = log_filter(0, true);
        assert!(filter.to_string().contains("trace"), "got {filter}");
    });
    temp_env::with_var(LOG_ENV, None::<&str>, || {
        let filter = log_filter(2, false);
        assert!(filter.to_string().contains("debug"), "got {filter}");
    });
}

#[rstest]
fn install_places_executable(workspace: Workspace) {
    let manifest = workspace.manifest();
    let target = workspace.root.join("bin/guilde-cli");
    let captured = run_args(&[
        "install",
        "--manifest",
        manifest.as_str(),
        "--target",
        target.as_str(),
        "--os",
        "linux",
        "--arch",
        "amd64",
    ]);

    captured.result.expect("install succeeds");
    assert_eq!(fs::read(&target).expect("read target"), EXECUTABLE);
    assert!(captured.stderr.contains("Installed guilde-cli 0.44.0"));
    assert!(captured.stderr.contains(&format!("{target} --version")));
}

#[rstest]
fn quiet_install_prints_nothing(workspace: Workspace) {
    let manifest = workspace.manifest();
    let install_dir = workspace.root.join("opt");
    let captured = run_args(&[
        "-q",
        "install",
        "0.44.0",
        "--manifest",
        manifest.as_str(),
        "--install-dir",
        install_dir.as_str(),
        "--os",
        "macos",
        "--arch",
        "arm64",
    ]);

    captured.result.expect("install succeeds");
    assert!(captured.stderr.is_empty());
    assert!(install_dir.join("guilde-cli").is_file());
}

#[rstest]
fn install_of_unknown_version_exits_21(workspace: Workspace) {
    let manifest = workspace.manifest();
    let target = workspace.root.join("bin/guilde-cli");
    let captured = run_args(&[
        "install",
        "1.0.0",
        "--manifest",
        manifest.as_str(),
        "--target",
        target.as_str(),
        "--os",
        "linux",
        "--arch",
        "arm64",
    ]);

    let err = captured.result.expect_err("expected missing version");
    assert_eq!(err.exit_code(), 21);
    assert!(!target.exists());
}

#[rstest]
fn resolve_prints_json_without_installing(workspace: Workspace) {
    let manifest = workspace.manifest();
    let target = workspace.root.join("bin/guilde-cli");
    let captured = run_args(&[
        "resolve",
        "--manifest",
        manifest.as_str(),
        "--target",
        target.as_str(),
        "--os",
        "macos",
        "--arch",
        "amd64",
        "--json",
    ]);

    captured.result.expect("resolve succeeds");
    let value: serde_json::Value = serde_json::from_str(&captured.stdout).expect("valid JSON");
    assert_eq!(value.get("version").and_then(|v| v.as_str()), Some("0.44.0"));
    assert_eq!(value.get("os").and_then(|v| v.as_str()), Some("macos"));
    assert!(!target.exists());
}

#[rstest]
fn list_prints_every_platform(workspace: Workspace) {
    let manifest = workspace.manifest();
    let captured = run_args(&["list", "--manifest", manifest.as_str()]);

    captured.result.expect("list succeeds");
    for platform in Platform::all() {
        assert!(
            captured.stdout.contains(&platform.to_string()),
            "missing {platform} in {}",
            captured.stdout
        );
    }
}

#[rstest]
fn hash_prints_sha256sum_lines(workspace: Workspace) {
    let file = workspace.root.join("empty");
    fs::write(&file, b"").expect("write file");
    let captured = run_args(&["hash", file.as_str()]);

    captured.result.expect("hash succeeds");
    assert_eq!(
        captured.stdout,
        format!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  {file}\n")
    );
}

#[rstest]
fn hash_of_missing_file_fails(workspace: Workspace) {
    let file = workspace.root.join("absent");
    let captured = run_args(&["hash", file.as_str()]);
    let err = captured.result.expect_err("expected failure");
    assert!(matches!(err, InstallerError::Hash { .. }));
}

#[rstest]
fn clean_sweeps_install_dir(workspace: Workspace) {
    let orphan = workspace.root.join(".formula-installer-abc");
    fs::write(&orphan, b"partial").expect("write orphan");
    let captured = run_args(&[
        "clean",
        "--install-dir",
        workspace.root.as_str(),
        "--older-than",
        "0",
    ]);

    captured.result.expect("clean succeeds");
    assert!(!orphan.exists());
    assert!(captured.stdout.contains("Removed 1 temporary file(s)"));
}

#[test]
fn missing_manifest_is_a_config_error() {
    let captured = run_args(&["list"]);
    let err = captured.result.expect_err("expected failure");
    assert!(matches!(
        err,
        InstallerError::Config(ConfigError::MissingManifest)
    ));
    assert_eq!(err.exit_code(), 1);
}

#[rstest]
fn config_file_supplies_manifest(workspace: Workspace) {
    let manifest = workspace.manifest();
    let config = workspace.root.join("config.toml");
    fs::write(&config, format!("manifest = \"{manifest}\"\n")).expect("write config");
    let captured = run_args(&["--config", config.as_str(), "list", "--json"]);

    captured.result.expect("list succeeds");
    assert!(captured.stdout.contains("\"guilde-cli\""));
}

#[test]
fn invalid_version_is_a_usage_error() {
    let err = VersionRequest::parse(Some("not-a-version")).expect_err("expected rejection");
    assert_eq!(InstallerError::from(err).exit_code(), 2);
}

#[test]
fn relative_manifest_path_resolves_from_cwd() {
    let location = SourceLocation::parse("guilde-cli.toml", None).expect("valid location");
    assert_eq!(
        location,
        SourceLocation::Local(Utf8Path::new("guilde-cli.toml").to_path_buf())
    );
}

#[rstest]
fn non_executable_mode_in_config_is_refused(workspace: Workspace) {
    let manifest = workspace.manifest();
    let config = workspace.root.join("config.toml");
    fs::write(&config, "mode = 0o644\n").expect("write config");
    let target = workspace.root.join("bin/guilde-cli");
    let captured = run_args(&[
        "--config",
        config.as_str(),
        "install",
        "--manifest",
        manifest.as_str(),
        "--target",
        target.as_str(),
        "--os",
        "linux",
        "--arch",
        "amd64",
    ]);

    let err = captured.result.expect_err("expected a config error");
    assert!(
        matches!(err, InstallerError::Config(ConfigError::InvalidValue { key: "mode", .. })),
        "got {err:?}"
    );
    assert_eq!(err.exit_code(), 1);
    assert!(!target.exists());
}
