//! Tests for installer CLI parsing and default behaviours.

use super::*;
use clap::CommandFactory;
use clap::error::ErrorKind;
use rstest::rstest;

fn install_args(cli: Cli) -> InstallArgs {
    match cli.command {
        Command::Install(args) => args,
        other => panic!("expected Install command, got {other:?}"),
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn install_defaults_to_latest_for_host() {
    let cli = Cli::parse_from(["formula-installer", "install"]);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert!(cli.config.is_none());
    assert_eq!(install_args(cli), InstallArgs::default());
}

#[test]
fn install_parses_every_flag() {
    let cli = Cli::parse_from([
        "formula-installer",
        "install",
        "0.44.0",
        "--manifest",
        "https://example.test/guilde-cli.toml",
        "--install-dir",
        "/opt/bin",
        "--timeout",
        "5",
        "--retries",
        "1",
        "--os",
        "linux",
        "--arch",
        "amd64",
    ]);
    let args = install_args(cli);

    assert_eq!(args.version.as_deref(), Some("0.44.0"));
    assert_eq!(
        args.source.manifest.as_deref(),
        Some("https://example.test/guilde-cli.toml")
    );
    assert_eq!(args.destination.install_dir, Some(Utf8PathBuf::from("/opt/bin")));
    assert_eq!(args.source.timeout, Some(5));
    assert_eq!(args.source.retries, Some(1));
    assert_eq!(
        args.platform.platform(),
        Some(Platform::new(Os::Linux, Arch::Amd64))
    );
}

#[rstest]
#[case::go_names(["darwin", "arm64"], Platform::new(Os::MacOs, Arch::Arm64))]
#[case::rust_names(["macos", "aarch64"], Platform::new(Os::MacOs, Arch::Arm64))]
#[case::linux_x86(["linux", "x86_64"], Platform::new(Os::Linux, Arch::Amd64))]
fn platform_flags_accept_aliases(#[case] pair: [&str; 2], #[case] expected: Platform) {
    let [os, arch] = pair;
    let cli = Cli::parse_from(["formula-installer", "install", "--os", os, "--arch", arch]);
    assert_eq!(install_args(cli).platform.platform(), Some(expected));
}

#[test]
fn os_without_arch_is_rejected() {
    let err = Cli::try_parse_from(["formula-installer", "install", "--os", "linux"])
        .expect_err("expected usage error");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn unknown_os_is_rejected() {
    let err = Cli::try_parse_from([
        "formula-installer",
        "install",
        "--os",
        "windows",
        "--arch",
        "amd64",
    ])
    .expect_err("expected usage error");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::parse_from([
        "formula-installer",
        "list",
        "-vv",
        "--config",
        "/etc/formula.toml",
    ]);
    assert_eq!(cli.verbosity, 2);
    assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/formula.toml")));
}

#[test]
fn verbose_and_quiet_conflict() {
    let err = Cli::try_parse_from(["formula-installer", "-v", "-q", "list"])
        .expect_err("expected conflict");
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn list_parses_json_and_host() {
    let cli = Cli::parse_from(["formula-installer", "list", "--json", "--host"]);
    match cli.command {
        Command::List(args) => {
            assert!(args.json);
            assert!(args.host);
        }
        other => panic!("expected List command, got {other:?}"),
    }
}

#[test]
fn resolve_parses_target() {
    let cli = Cli::parse_from([
        "formula-installer",
        "resolve",
        "latest",
        "--target",
        "/tmp/guilde",
        "--json",
    ]);
    match cli.command {
        Command::Resolve(args) => {
            assert_eq!(args.version.as_deref(), Some("latest"));
            assert_eq!(args.destination.target, Some(Utf8PathBuf::from("/tmp/guilde")));
            assert!(args.json);
        }
        other => panic!("expected Resolve command, got {other:?}"),
    }
}

#[test]
fn hash_requires_a_file() {
    let err = Cli::try_parse_from(["formula-installer", "hash"]).expect_err("expected usage error");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn clean_defaults_to_an_hour() {
    let cli = Cli::parse_from(["formula-installer", "clean"]);
    match cli.command {
        Command::Clean(args) => assert_eq!(args, CleanArgs::default()),
        other => panic!("expected Clean command, got {other:?}"),
    }
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let err = Cli::try_parse_from(["formula-installer"]).expect_err("expected usage error");
    assert_eq!(err.exit_code(), 2);
}

#[rstest]
#[case::install(
    &["formula-installer", "install", "-m", "m.toml", "--target", "/t", "--retries", "2"],
    Overrides {
        manifest: Some("m.toml".to_owned()),
        target: Some(Utf8PathBuf::from("/t")),
        retry_attempts: Some(2),
        ..Overrides::default()
    }
)]
#[case::list(
    &["formula-installer", "list", "--timeout", "9"],
    Overrides { timeout_secs: Some(9), ..Overrides::default() }
)]
#[case::clean(
    &["formula-installer", "clean", "--install-dir", "/opt/bin"],
    Overrides { install_dir: Some(Utf8PathBuf::from("/opt/bin")), ..Overrides::default() }
)]
#[case::hash(&["formula-installer", "hash", "a"], Overrides::default())]
fn commands_map_to_overrides(#[case] argv: &[&str], #[case] expected: Overrides) {
    let cli = Cli::parse_from(argv.iter().copied());
    assert_eq!(cli.command.overrides(), expected);
}
