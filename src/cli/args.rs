use crate::domain::options::Feature;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command line arguments for Shroud
#[derive(Parser, Debug)]
#[command(
    name = "shroud",
    about = "Obfuscate scripts and manage runtime keys",
    long_about = "A code protection toolchain: generate obfuscated scripts, outer runtime keys and runtime packages, edit persisted settings and register licenses.",
    disable_version_flag = true
)]
pub struct Args {
    /// Show version information and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Suppress all normal output
    #[arg(short = 'q', long)]
    pub silent: bool,

    /// Print debug information in the console
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Interactive mode
    #[arg(short = 'i')]
    pub interactive: bool,

    /// Home path for global settings and registration
    #[arg(long, value_name = "PATH", hide = true)]
    pub home: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate obfuscated scripts and required runtime files
    #[command(
        visible_aliases = ["gen", "g"],
        after_help = "\
EXAMPLES:
    # generate obfuscated scripts and all required runtime files
    shroud gen <options> <scripts>

    # generate outer runtime key only
    shroud gen key <options> [NAME]

    # generate runtime package only
    shroud gen runtime <options>"
    )]
    Generate(GenerateArgs),

    /// Show and change persisted settings
    #[command(
        visible_alias = "cfg",
        after_help = "\
EXAMPLES:
    shroud cfg                      # show all sections
    shroud cfg SECT                 # show all options in section SECT
    shroud cfg SECT OPT             # show value of option OPT
    shroud cfg SECT OPT=VALUE       # change option value"
    )]
    Configure(ConfigureArgs),

    /// Register or upgrade the license
    #[command(
        visible_aliases = ["reg", "r"],
        long_about = "Register or upgrade the license.\n\n\
            The product name can be set the first time a license is registered. \
            Once registered it cannot be changed, unless it was registered as \"TBD\", \
            which may be replaced once.\n\n\
            Use -t to check the registration first, then drop -t to register for real."
    )]
    Register(RegisterArgs),
}

/// Generate command arguments
#[derive(ClapArgs, Debug, Default)]
pub struct GenerateArgs {
    /// Output path
    #[arg(short = 'O', long, value_name = "PATH")]
    pub output: Option<String>,

    /// Pack obfuscated scripts into BUNDLE
    #[arg(
        long,
        value_name = "BUNDLE",
        conflicts_with = "no_runtime",
        help_heading = "Action arguments"
    )]
    pub pack: Option<String>,

    /// Do not generate runtime package
    #[arg(long, help_heading = "Action arguments")]
    pub no_runtime: bool,

    /// Search scripts in recursive mode
    #[arg(short = 'r', long, help_heading = "Obfuscation arguments")]
    pub recursive: bool,

    #[arg(short = 'a', long = "all", hide = true)]
    pub findall: bool,

    #[arg(long = "include", value_name = "PATTERN", hide = true)]
    pub includes: Vec<String>,

    #[arg(long = "exclude", value_name = "PATTERN", hide = true)]
    pub excludes: Vec<String>,

    /// Obfuscate module level code
    #[arg(
        long,
        value_name = "0|1",
        value_parser = clap::value_parser!(u8).range(0..=1),
        help_heading = "Obfuscation arguments"
    )]
    pub obf_module: Option<u8>,

    /// Obfuscate each function
    #[arg(
        long,
        value_name = "0|1",
        value_parser = clap::value_parser!(u8).range(0..=1),
        help_heading = "Obfuscation arguments"
    )]
    pub obf_code: Option<u8>,

    /// Do not wrap functions
    #[arg(long, help_heading = "Obfuscation arguments")]
    pub no_wrap: bool,

    /// Protect string constants
    #[arg(long, help_heading = "Obfuscation arguments")]
    pub mix_str: bool,

    #[arg(long, hide = true)]
    pub mix_name: bool,

    #[arg(long, hide = true)]
    pub enable_bcc: bool,

    #[arg(long, hide = true)]
    pub enable_rft: bool,

    #[arg(long, hide = true)]
    pub enable_jit: bool,

    #[arg(long, hide = true)]
    pub enable_themida: bool,

    #[arg(long, hide = true)]
    pub assert_call: bool,

    #[arg(long, hide = true)]
    pub assert_import: bool,

    /// Enable obfuscation features, may be repeated
    #[arg(
        long = "enable",
        value_enum,
        value_name = "FEATURE",
        help_heading = "Obfuscation arguments"
    )]
    pub enables: Vec<FeatureArg>,

    /// Restrict obfuscated scripts
    #[arg(
        long = "restrict",
        value_name = "0|1|2",
        value_parser = clap::value_parser!(u8).range(0..=2),
        help_heading = "Obfuscation arguments"
    )]
    pub restrict_module: Option<u8>,

    /// Import runtime package in relative way
    #[arg(short = 'i', help_heading = "Runtime package arguments")]
    pub relative_import: bool,

    /// Import runtime package with PREFIX
    #[arg(long, value_name = "PREFIX", help_heading = "Runtime package arguments")]
    pub relative: Option<String>,

    /// Target platform to run obfuscated scripts, may be repeated
    #[arg(
        long = "platform",
        value_name = "NAME",
        help_heading = "Runtime package arguments"
    )]
    pub platforms: Vec<String>,

    /// Use outer key for obfuscated scripts
    #[arg(long, value_name = "NAME", help_heading = "Runtime key arguments")]
    pub outer: Option<String>,

    /// Expired date of obfuscated scripts
    #[arg(short = 'e', long, value_name = "DATE", help_heading = "Runtime key arguments")]
    pub expired: Option<String>,

    /// Check runtime key every N hours
    #[arg(long, value_name = "N", help_heading = "Runtime key arguments")]
    pub period: Option<u32>,

    /// Bind obfuscated scripts to device, may be repeated
    #[arg(
        short = 'b',
        long = "bind-device",
        value_name = "DEV",
        help_heading = "Runtime key arguments"
    )]
    pub devices: Vec<String>,

    #[arg(long, value_name = "INTERP", hide = true)]
    pub bind_interp: Option<String>,

    #[arg(long, value_name = "HOOK", hide = true)]
    pub hook: Option<String>,

    /// Scripts, packages or keyword "key", "runtime"
    #[arg(value_name = "ARG", required = true, num_args = 1..)]
    pub inputs: Vec<String>,
}

/// Configure command arguments
#[derive(ClapArgs, Debug, Default)]
pub struct ConfigureArgs {
    /// Apply to the private settings of module or package NAME
    #[arg(short = 'p', value_name = "NAME")]
    pub name: Option<String>,

    /// Edit global settings instead of local settings
    #[arg(short = 'g', long = "global")]
    pub global: bool,

    /// Remove section or options
    #[arg(short = 'r', long, conflicts_with = "clear")]
    pub remove: bool,

    /// Clear the configuration file
    #[arg(long)]
    pub clear: bool,

    /// Encoding used to read the configuration file
    #[arg(long, value_name = "NAME")]
    pub encoding: Option<String>,

    /// Section name
    pub section: Option<String>,

    /// Option name or "name=value"
    #[arg(value_name = "OPTION")]
    pub options: Vec<String>,
}

/// Register command arguments
#[derive(ClapArgs, Debug)]
pub struct RegisterArgs {
    #[arg(short = 'r', long, value_name = "NAME", hide = true)]
    pub regname: Option<String>,

    /// License to this product
    #[arg(short = 'p', long, value_name = "NAME")]
    pub product: Option<String>,

    /// Upgrade the existing license
    #[arg(short = 'u', long)]
    pub upgrade: bool,

    /// Dry run, check everything but do not register
    #[arg(short = 't', long)]
    pub dry: bool,

    /// Registration file
    #[arg(value_name = "FILE")]
    pub regfile: PathBuf,
}

/// Feature names accepted by `--enable`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureArg {
    Jit,
    Bcc,
    Rft,
    Themida,
}

impl From<FeatureArg> for Feature {
    fn from(feature: FeatureArg) -> Self {
        match feature {
            FeatureArg::Jit => Self::Jit,
            FeatureArg::Bcc => Self::Bcc,
            FeatureArg::Rft => Self::Rft,
            FeatureArg::Themida => Self::Themida,
        }
    }
}
