use crate::cli::app::{parse_args, report, Parsed};
use crate::cli::commands::{execute, print_version};
use crate::cli::output::OutputWriter;
use crate::core::context::Context;
use crate::core::engine::BuildEngine;
use crate::domain::error::ShroudResult;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Line oriented shell behind `shroud -i`.
///
/// Each line is one command line without the program name. Every line gets
/// a fresh context on the same home path; a failing line is reported and the
/// loop goes on.
pub struct Shell {
    home: PathBuf,
    workdir: PathBuf,
}

impl Shell {
    pub fn new(home: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            workdir: workdir.into(),
        }
    }

    /// Read commands until `exit`, `quit` or end of input
    pub fn run<R: BufRead>(
        &self,
        input: R,
        engine: &mut dyn BuildEngine,
        writer: &mut dyn OutputWriter,
    ) -> ShroudResult<()> {
        for line in input.lines() {
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.first() {
                None => continue,
                Some(&"exit") | Some(&"quit") => break,
                Some(_) => {}
            }

            if let Err(e) = self.run_line(&tokens, engine, writer) {
                report(&e, &self.workdir);
            }
        }
        debug!("leave interactive mode");
        Ok(())
    }

    fn run_line(
        &self,
        tokens: &[&str],
        engine: &mut dyn BuildEngine,
        writer: &mut dyn OutputWriter,
    ) -> ShroudResult<()> {
        let args = match parse_args(std::iter::once("shroud").chain(tokens.iter().copied()))? {
            Parsed::Args(args) => args,
            Parsed::Help(text) => return writer.write_message(text.trim_end()),
        };

        let mut ctx = Context::new(&self.home, &self.workdir);
        if args.version {
            return print_version(&ctx, writer);
        }
        if args.interactive {
            warn!("already in interactive mode");
            return Ok(());
        }
        execute(args, &mut ctx, engine, writer)
    }
}
