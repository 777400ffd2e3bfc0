//! Formula installer CLI entrypoint.
//!
//! This binary loads a release manifest, picks the artifact for the host
//! platform, verifies its digest and installs the executable. Progress goes
//! to stderr; command results (listings, digests) go to stdout.

use clap::Parser;
use formula_installer::cancel::CancellationToken;
use formula_installer::catalog::Catalog;
use formula_installer::catalog::platform::Platform;
use formula_installer::catalog::source::SourceLocation;
use formula_installer::cli::{CleanArgs, Cli, Command, HashArgs, ListArgs, ResolveArgs};
use formula_installer::config::{ConfigError, FileConfig, Settings, default_install_dir};
use formula_installer::dirs::{BaseDirs, SystemBaseDirs};
use formula_installer::error::{InstallerError, Result};
use formula_installer::fetch::{ArtifactFetcher, RetryPolicy, default_fetcher};
use formula_installer::install::{Installer, sweep_orphans};
use formula_installer::output::{
    clean_report, digest_line, format_catalog_human, format_catalog_json, format_resolved_human,
    format_resolved_json, outcome_message, write_stderr_line,
};
use formula_installer::pipeline::{InstallPlan, Pipeline};
use formula_installer::resolver::{VersionRequest, host_platform, resolve};
use formula_installer::verify::digest_file;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the `-v`/`-q` log level.
const LOG_ENV: &str = "FORMULA_INSTALLER_LOG";

/// Output streams for one invocation.
struct Streams<'a> {
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    let dirs = SystemBaseDirs::new();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(
        &cli,
        dirs.as_ref().map(|d| d as &dyn BaseDirs),
        &mut Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
    );
    ExitCode::from(exit_code_for_run_result(run_result, &mut stderr))
}

fn init_logging(cli: &Cli) {
    // A second initialisation only happens in tests; the first one wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbosity, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_filter(verbosity: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity, quiet)))
}

const fn default_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(cli: &Cli, dirs: Option<&dyn BaseDirs>, streams: &mut Streams<'_>) -> Result<()> {
    match &cli.command {
        Command::Hash(args) => return run_hash(args, streams.stdout),
        Command::Clean(args) => return run_clean(cli, args, dirs, streams.stdout),
        Command::Install(_) | Command::Resolve(_) | Command::List(_) => {}
    }

    let settings = load_settings(cli, dirs)?;
    let cancel = CancellationToken::new();
    let fetcher = default_fetcher(
        settings.timeout(),
        RetryPolicy::with_attempts(settings.retry_attempts()),
    );
    let pipeline = Pipeline::new(&fetcher, Installer::new(settings.mode()), cancel);
    let catalog = load_catalog(&pipeline, &settings)?;

    match &cli.command {
        Command::Install(args) => {
            let context = InstallContext {
                cli,
                settings: &settings,
                catalog: &catalog,
            };
            let platform = platform_or_host(args.platform.platform())?;
            run_install(&context, &pipeline, args.version.as_deref(), platform, streams.stderr)
        }
        Command::Resolve(args) => run_resolve(&settings, &catalog, args, streams.stdout),
        Command::List(args) => run_list(&catalog, args, streams.stdout),
        // Handled before the manifest is loaded.
        Command::Hash(_) | Command::Clean(_) => Ok(()),
    }
}

/// Merges the config file with command-line overrides.
fn load_settings(cli: &Cli, dirs: Option<&dyn BaseDirs>) -> Result<Settings> {
    let file = match (cli.config.as_deref(), dirs) {
        (Some(path), _) => FileConfig::load(path)?,
        (None, Some(dirs)) => FileConfig::discover(None, dirs)?,
        (None, None) => FileConfig::default(),
    };
    let default_dir = dirs.and_then(default_install_dir);
    Ok(Settings::merge(&file, cli.command.overrides(), default_dir)?)
}

fn load_catalog<F: ArtifactFetcher + ?Sized>(
    pipeline: &Pipeline<'_, F>,
    settings: &Settings,
) -> Result<Catalog> {
    let location = SourceLocation::parse(settings.manifest()?, None)?;
    log::debug!("loading manifest from {location}");
    pipeline.load_catalog(&location)
}

fn platform_or_host(explicit: Option<Platform>) -> Result<Platform> {
    match explicit {
        Some(platform) => Ok(platform),
        None => Ok(host_platform()?),
    }
}

struct InstallContext<'a> {
    cli: &'a Cli,
    settings: &'a Settings,
    catalog: &'a Catalog,
}

fn run_install<F: ArtifactFetcher + ?Sized>(
    context: &InstallContext<'_>,
    pipeline: &Pipeline<'_, F>,
    version: Option<&str>,
    platform: Platform,
    stderr: &mut dyn Write,
) -> Result<()> {
    let request = VersionRequest::parse(version)?;
    let target = context.settings.target_path(context.catalog.name())?;
    let quiet = context.cli.quiet;

    if !quiet {
        write_stderr_line(
            stderr,
            format!(
                "Installing {} {request} for {platform} to {target}...",
                context.catalog.name()
            ),
        );
    }

    let plan = InstallPlan {
        request: &request,
        platform,
        target: &target,
    };
    let outcome = pipeline.run(context.catalog, &plan, &mut |state| {
        log::info!("{state}");
    })?;

    if !quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, outcome_message(context.catalog.name(), &outcome));
    }
    Ok(())
}

fn run_resolve(
    settings: &Settings,
    catalog: &Catalog,
    args: &ResolveArgs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let request = VersionRequest::parse(args.version.as_deref())?;
    let platform = platform_or_host(args.platform.platform())?;
    let resolved = resolve(catalog, &request, platform)?;
    let target = settings.target_path(catalog.name())?;
    let text = if args.json {
        format_resolved_json(resolved.entry(), &target)
    } else {
        format_resolved_human(resolved.entry(), &target)
    };
    write_stdout(stdout, &text)
}

fn run_list(catalog: &Catalog, args: &ListArgs, stdout: &mut dyn Write) -> Result<()> {
    let only = if args.host {
        Some(host_platform()?)
    } else {
        None
    };
    let text = if args.json {
        format_catalog_json(catalog, only)
    } else {
        format_catalog_human(catalog, only)
    };
    write_stdout(stdout, &text)
}

fn run_hash(args: &HashArgs, stdout: &mut dyn Write) -> Result<()> {
    for path in &args.files {
        let digest = digest_file(path).map_err(|source| InstallerError::Hash {
            path: path.clone(),
            source,
        })?;
        write_stdout(stdout, &digest_line(&digest, path))?;
    }
    Ok(())
}

fn run_clean(
    cli: &Cli,
    args: &CleanArgs,
    dirs: Option<&dyn BaseDirs>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let settings = load_settings(cli, dirs)?;
    let dir = settings
        .install_dir()
        .ok_or(ConfigError::MissingInstallDir)?;
    let older_than = Duration::from_secs(args.older_than.saturating_mul(60));
    let removed = sweep_orphans(dir, older_than)?;
    if cli.quiet {
        return Ok(());
    }
    write_stdout(stdout, &clean_report(dir, &removed))
}

fn write_stdout(stdout: &mut dyn Write, text: &str) -> Result<()> {
    writeln!(stdout, "{text}").map_err(|e| InstallerError::WriteFailed {
        reason: e.to_string(),
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
