use crate::cli::args::{Args, Command, ConfigureArgs, GenerateArgs, RegisterArgs};
use crate::cli::output::OutputWriter;
use crate::core::configure::{ConfigEditor, ConfigMode, ConfigTarget, Configurer};
use crate::core::context::Context;
use crate::core::engine::{key_info, output_dir, BuildEngine};
use crate::core::normalize::normalize_generate;
use crate::core::register::{
    DryRunRegistrar, LicenseRegistrar, RegisterMode, RegisterRequest, Registrar,
};
use crate::core::validate::check_generate_context;
use crate::domain::error::{ShroudError, ShroudResult};
use crate::domain::options::NormalizedOptions;
use crate::infrastructure::config::TextEncoding;
use anyhow::Context as _;
use clap::CommandFactory;
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, info};

/// What `shroud gen` produces, chosen by the first positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateTarget {
    Key,
    Runtime,
    Scripts,
}

impl GenerateTarget {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "key" | "k" => GenerateTarget::Key,
            "runtime" | "run" | "r" => GenerateTarget::Runtime,
            _ => GenerateTarget::Scripts,
        }
    }
}

/// Run a parsed command line against an existing context.
///
/// Prints help when no command was given.
pub fn execute(
    args: Args,
    ctx: &mut Context,
    engine: &mut dyn BuildEngine,
    writer: &mut dyn OutputWriter,
) -> ShroudResult<()> {
    match args.command {
        Some(command) => dispatch(command, ctx, engine, writer),
        None => writer.write_message(&Args::command().render_help().to_string()),
    }
}

/// Route one command to its handler
pub fn dispatch(
    command: Command,
    ctx: &mut Context,
    engine: &mut dyn BuildEngine,
    writer: &mut dyn OutputWriter,
) -> ShroudResult<()> {
    match command {
        Command::Generate(args) => cmd_generate(args, ctx, engine),
        Command::Configure(args) => cmd_configure(args, ctx, writer),
        Command::Register(args) => cmd_register(args, ctx, writer),
    }
}

/// Version line followed by the license summary
pub fn print_version(ctx: &Context, writer: &mut dyn OutputWriter) -> ShroudResult<()> {
    writer.write_message(&format!("Shroud {}", ctx.version_info()))?;
    writer.write_message("")?;
    writer.write_message(&LicenseRegistrar::new(ctx).summary()?)
}

pub fn cmd_generate(
    args: GenerateArgs,
    ctx: &mut Context,
    engine: &mut dyn BuildEngine,
) -> ShroudResult<()> {
    let options = normalize_generate(&args);
    debug!(
        "command options: {}",
        serde_json::to_string(&options).context("serialize command options")?
    );

    ctx.push(&options);
    check_generate_context(ctx)?;

    let first = args
        .inputs
        .first()
        .ok_or_else(|| ShroudError::usage("missing scripts or packages"))?;

    match GenerateTarget::from_token(first) {
        GenerateTarget::Key => generate_key(ctx, &args.inputs, &options, engine),
        GenerateTarget::Runtime => generate_runtime(ctx, &args.inputs, &options, engine),
        GenerateTarget::Scripts => {
            engine.process(ctx, &options, args.pack.as_deref())?;
            info!("finish generating obfuscated scripts");
            Ok(())
        }
    }
}

fn generate_key(
    ctx: &Context,
    inputs: &[String],
    options: &NormalizedOptions,
    engine: &mut dyn BuildEngine,
) -> ShroudResult<()> {
    let extra = &inputs[1..];
    if extra.len() > 1 {
        return Err(ShroudError::usage(format!("too many args {:?}", extra)));
    }

    let name = match extra.first() {
        Some(name) => name.clone(),
        None => ctx.runtime_keyid()?,
    };
    check_key_name(&name)?;
    info!("start to generate outer runtime key \"{}\"", name);

    let data = engine.generate_runtime_key(ctx, &name)?;
    let output = output_dir(ctx, options)?;
    fs::create_dir_all(&output)
        .with_context(|| format!("create output directory {}", output.display()))?;
    let path = output.join(&name);
    fs::write(&path, data).with_context(|| format!("write runtime key {}", path.display()))?;

    let record = ctx.save_outer_info(&key_info(ctx, &name)?)?;
    debug!("record outer key metadata in \"{}\"", record.display());
    info!("generate outer runtime key \"{}\" OK", path.display());
    Ok(())
}

/// A key name must be one plain file name, never a path
fn check_key_name(name: &str) -> ShroudResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(ShroudError::usage(format!(
            "invalid key name \"{}\", it must be a file name without path",
            name
        ))),
    }
}

fn generate_runtime(
    ctx: &Context,
    inputs: &[String],
    options: &NormalizedOptions,
    engine: &mut dyn BuildEngine,
) -> ShroudResult<()> {
    if inputs.len() > 1 {
        return Err(ShroudError::usage(format!(
            "too many args {:?}",
            &inputs[1..]
        )));
    }

    let output = output_dir(ctx, options)?;
    info!("start to generate runtime package in \"{}\"", output.display());
    let key = engine.generate_runtime(ctx, &output)?;

    let keyfile = ctx.runtime_keyfile()?;
    check_key_name(&keyfile)?;
    fs::create_dir_all(&output)
        .with_context(|| format!("create output directory {}", output.display()))?;
    let keyfile = output.join(keyfile);
    fs::write(&keyfile, key).with_context(|| format!("write runtime key {}", keyfile.display()))?;
    info!("generate runtime key \"{}\" OK", keyfile.display());
    Ok(())
}

pub fn cmd_configure(
    args: ConfigureArgs,
    ctx: &Context,
    writer: &mut dyn OutputWriter,
) -> ShroudResult<()> {
    let target = ConfigTarget::new(args.global, args.name)?;
    let encoding = args
        .encoding
        .as_deref()
        .map(str::parse::<TextEncoding>)
        .transpose()?
        .unwrap_or_default();
    let mode = ConfigMode::from_args(args.clear, args.remove, args.section, args.options)?;
    debug!("configure {:?} in {:?} scope", mode, target.scope);

    let mut editor = ConfigEditor::new(ctx, encoding);
    match mode {
        ConfigMode::Clear => {
            if !editor.clear(&target)? {
                writer.write_message("no configuration file to clear")?;
            }
        }
        ConfigMode::Remove { section, options } => {
            editor.remove(&target, &section, &options)?;
        }
        ConfigMode::Show { section, options } => {
            let view = editor.show(&target, section.as_deref(), &options)?;
            writer.write_view(&view)?;
        }
        ConfigMode::Set {
            section,
            assignments,
        } => {
            editor.set(&target, &section, &assignments)?;
            let names: Vec<String> = assignments.into_iter().map(|(name, _)| name).collect();
            let view = editor.show(&target, Some(&section), &names)?;
            writer.write_view(&view)?;
        }
    }
    Ok(())
}

pub fn cmd_register(
    args: RegisterArgs,
    ctx: &Context,
    writer: &mut dyn OutputWriter,
) -> ShroudResult<()> {
    let request = RegisterRequest {
        regfile: args.regfile,
        regname: args.regname.unwrap_or_default(),
        product: args.product,
    };

    let mut registrar: Box<dyn Registrar + '_> = if args.dry {
        Box::new(DryRunRegistrar::new(ctx))
    } else {
        Box::new(LicenseRegistrar::new(ctx))
    };

    registrar.check_args(&request)?;
    match RegisterMode::from_flag(args.upgrade) {
        RegisterMode::Register => registrar.register(&request)?,
        RegisterMode::Upgrade => registrar.upgrade(&request)?,
    };
    writer.write_message(&registrar.summary()?)
}
