// Shroud - Code protection command line
use std::process::ExitCode;

fn main() -> ExitCode {
    shroud::cli::run(std::env::args_os())
}
