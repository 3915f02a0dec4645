// Logging module - Console, debug and forensic logging
use crate::domain::error::ShroudError;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, Layer};

/// Forensic log written when an unexpected failure is reported
pub const ERROR_LOGFILE: &str = "shroud.error.log";
/// Run detail captured with `--debug`
pub const DEBUG_LOGFILE: &str = "shroud.debug.log";

/// Logging configuration, built once from the verbosity flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum severity shown on the console
    pub console_level: LevelFilter,
    /// Extra file receiving debug detail, truncated on install
    pub debug_file: Option<PathBuf>,
    /// Colorize console output
    pub ansi: bool,
}

impl LogConfig {
    /// Silent wins over debug for the console; debug still gets its file.
    pub fn from_flags(silent: bool, debug: bool, workdir: &Path) -> Self {
        let console_level = if silent {
            LevelFilter::ERROR
        } else if debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        Self {
            console_level,
            debug_file: debug.then(|| workdir.join(DEBUG_LOGFILE)),
            ansi: io::stderr().is_terminal(),
        }
    }

    /// Build a subscriber whose console layer writes to `writer`
    pub fn build_subscriber<W>(&self, writer: W) -> io::Result<impl Subscriber + Send + Sync + 'static>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let console = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi)
            .with_target(false)
            .without_time()
            .with_filter(self.console_level);

        let debug_layer = match &self.debug_file {
            Some(path) => {
                let file = File::create(path)?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false)
                        .with_filter(LevelFilter::DEBUG),
                )
            }
            None => None,
        };

        Ok(tracing_subscriber::registry().with(console).with(debug_layer))
    }

    /// Install the stderr subscriber as the process default
    pub fn install(&self) -> io::Result<()> {
        let subscriber = self.build_subscriber(io::stderr)?;
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::INFO,
            debug_file: None,
            ansi: false,
        }
    }
}

/// Dedicated log for unexpected failures.
///
/// Uses its own subscriber so console verbosity never filters it.
#[derive(Debug, Clone)]
pub struct ForensicLog {
    path: PathBuf,
}

impl ForensicLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(workdir: &Path) -> Self {
        Self::new(workdir.join(ERROR_LOGFILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log and write the full causal trace of `error`
    pub fn record(&self, error: &ShroudError) -> io::Result<()> {
        let file = File::create(&self.path)?;
        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(LevelFilter::TRACE)
            .finish();

        let trace = causal_trace(error);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(
                target: "shroud::error",
                pid = std::process::id(),
                "{}",
                trace
            );
        });
        Ok(())
    }
}

/// Render an error with every cause, one per line
pub fn causal_trace(error: &ShroudError) -> String {
    if let ShroudError::Internal(inner) = error {
        // anyhow renders the chain, plus a backtrace when one was captured
        return format!("{:?}", inner);
    }

    let mut trace = error.to_string();
    let mut source = std::error::Error::source(error);
    let mut depth = 0;
    while let Some(cause) = source {
        if depth == 0 {
            trace.push_str("\n\nCaused by:");
        }
        trace.push_str(&format!("\n    {}: {}", depth, cause));
        source = cause.source();
        depth += 1;
    }
    trace
}
