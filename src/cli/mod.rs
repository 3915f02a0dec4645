// CLI module - Command line interface
pub mod app;
pub mod args;
pub mod commands;
pub mod output;
pub mod shell;

pub use app::run;
pub use args::{Args, Command};
pub use commands::{dispatch, execute};
pub use output::{ConsoleWriter, OutputWriter};
