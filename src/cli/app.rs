//! Process entry: parse, resolve, dispatch and report.

use crate::cli::args::Args;
use crate::cli::commands::{execute, print_version};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::cli::shell::Shell;
use crate::core::context::{resolve_home, Context, HOME_ENV};
use crate::core::engine::ManifestEngine;
use crate::domain::error::{ShroudError, ShroudResult, EXIT_INTERNAL_FAILURE, EXIT_SUCCESS};
use crate::infrastructure::logging::{ForensicLog, LogConfig, ERROR_LOGFILE};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, info};

/// Outcome of parsing one command line
#[derive(Debug)]
pub enum Parsed {
    Args(Args),
    /// Help text requested with `-h` / `--help`
    Help(String),
}

/// Parse a command line; clap failures become usage errors
pub fn parse_args<I, T>(argv: I) -> ShroudResult<Parsed>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(argv) {
        Ok(args) => Ok(Parsed::Args(args)),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                    | ErrorKind::DisplayVersion
            ) =>
        {
            Ok(Parsed::Help(e.render().to_string()))
        }
        Err(e) => {
            let rendered = e.to_string();
            let message = rendered.trim_end();
            Err(ShroudError::usage(
                message.strip_prefix("error: ").unwrap_or(message),
            ))
        }
    }
}

/// Report a failure on the console and return its exit status.
///
/// Expected failures are logged as they are. Anything else goes to the
/// forensic log and the console only gets a pointer to it.
pub fn report(error: &ShroudError, workdir: &Path) -> u8 {
    if error.is_expected() {
        error!("{}", error);
        return error.exit_code();
    }

    let log = ForensicLog::in_dir(workdir);
    match log.record(error) {
        Ok(()) => error!("unknown error, please check {}", ERROR_LOGFILE),
        Err(e) => error!("unknown error: {} (cannot write {}: {})", error, ERROR_LOGFILE, e),
    }
    error.exit_code()
}

/// Report a rejected command line, falling back to plain stderr when the
/// console logger could not be installed
fn report_parse_failure(error: &ShroudError, workdir: &Path, logging: io::Result<()>) -> u8 {
    match logging {
        Ok(()) => report(error, workdir),
        Err(e) => {
            eprintln!("{}", error);
            eprintln!("cannot initialize logging: {}", e);
            error.exit_code()
        }
    }
}

/// Main entry, returns the process exit status
pub fn run<I, T>(argv: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let workdir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("cannot access working directory: {}", e);
            return ExitCode::from(EXIT_INTERNAL_FAILURE);
        }
    };

    let args = match parse_args(argv) {
        Ok(Parsed::Args(args)) => args,
        Ok(Parsed::Help(text)) => {
            print!("{}", text);
            return ExitCode::from(EXIT_SUCCESS);
        }
        Err(e) => {
            // verbosity flags are unknown when parsing fails
            let logging = LogConfig::default().install();
            return ExitCode::from(report_parse_failure(&e, &workdir, logging));
        }
    };

    let log_config = LogConfig::from_flags(args.silent, args.debug, &workdir);
    if let Err(e) = log_config.install() {
        eprintln!("cannot initialize logging: {}", e);
        return ExitCode::from(EXIT_INTERNAL_FAILURE);
    }

    let home_env = std::env::var(HOME_ENV).ok();
    let mut writer = ConsoleWriter::stdout();
    let code = match start(args, home_env.as_deref(), &workdir, &mut writer) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => report(&e, &workdir),
    };
    ExitCode::from(code)
}

/// Resolve the context for `args` and run it to completion
pub fn start(
    args: Args,
    home_env: Option<&str>,
    workdir: &Path,
    writer: &mut dyn OutputWriter,
) -> ShroudResult<()> {
    let home = resolve_home(args.home.as_deref(), home_env, workdir)?;
    let mut ctx = Context::new(home, workdir);
    let mut engine = ManifestEngine::new();

    if args.version {
        return print_version(&ctx, writer);
    }

    if args.interactive {
        info!("enter interactive mode, type \"exit\" to quit");
        let shell = Shell::new(ctx.home(), workdir);
        return shell.run(io::stdin().lock(), &mut engine, writer);
    }

    info!("Shroud {}", ctx.version_info());
    debug!("platform {}", Context::native_platform());
    debug!("home path: {}", ctx.home().display());
    execute(args, &mut ctx, &mut engine, writer)
}
