use crate::core::context::Context;
use crate::domain::config::{OuterKeyInfo, BUILDER_SECTION};
use crate::domain::error::{ShroudError, ShroudResult};
use crate::domain::options::{NormalizedOptions, OptionValue};
use anyhow::Context as _;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest describing a build request
pub const BUILD_MANIFEST: &str = "build.json";
/// Manifest describing a runtime package
pub const RUNTIME_MANIFEST: &str = "runtime.json";

/// The generation and build engine behind `shroud gen`
pub trait BuildEngine {
    /// Produce the content of an outer runtime key named `name`
    fn generate_runtime_key(&mut self, ctx: &Context, name: &str) -> ShroudResult<Vec<u8>>;

    /// Write a runtime package into `output` and return its runtime key
    fn generate_runtime(&mut self, ctx: &Context, output: &Path) -> ShroudResult<Vec<u8>>;

    /// Obfuscate the inputs named in `options`, optionally into one bundle
    fn process(
        &mut self,
        ctx: &Context,
        options: &NormalizedOptions,
        pack: Option<&str>,
    ) -> ShroudResult<()>;
}

/// Output directory of a generate request
pub fn output_dir(ctx: &Context, options: &NormalizedOptions) -> ShroudResult<PathBuf> {
    // an empty value counts as unset
    let output = match options.text("output").filter(|output| !output.is_empty()) {
        Some(output) => output.to_string(),
        None => ctx
            .setting(BUILDER_SECTION, "output")?
            .filter(|output| !output.is_empty())
            .unwrap_or_else(|| "dist".to_string()),
    };
    Ok(ctx.workdir().join(output))
}

/// Key metadata derived from the current run
pub fn key_info(ctx: &Context, name: &str) -> ShroudResult<OuterKeyInfo> {
    Ok(OuterKeyInfo {
        name: name.to_string(),
        expired: ctx.option("expired").and_then(OptionValue::as_text).map(str::to_string),
        period: ctx.option("period").and_then(OptionValue::as_int),
        devices: ctx
            .option("devices")
            .and_then(OptionValue::as_list)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        platforms: ctx.runtime_platforms()?,
    })
}

#[derive(Serialize)]
struct KeyDescriptor<'a> {
    version: &'a str,
    #[serde(flatten)]
    info: &'a OuterKeyInfo,
}

#[derive(Serialize)]
struct RuntimeManifest<'a> {
    version: &'a str,
    platforms: Vec<String>,
    keyfile: String,
    outer: Option<String>,
    relative_import: Option<&'a OptionValue>,
}

#[derive(Serialize)]
struct BuildManifest<'a> {
    version: &'a str,
    inputs: &'a [String],
    pack: Option<&'a str>,
    options: &'a NormalizedOptions,
}

/// Engine handing validated requests to the external builder.
///
/// Writes JSON manifests into the output directory; the builder picks them
/// up from there.
#[derive(Debug, Default)]
pub struct ManifestEngine;

impl ManifestEngine {
    pub fn new() -> Self {
        Self
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> ShroudResult<()> {
        let content = serde_json::to_vec_pretty(value)
            .with_context(|| format!("serialize {}", path.display()))?;
        fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

impl BuildEngine for ManifestEngine {
    fn generate_runtime_key(&mut self, ctx: &Context, name: &str) -> ShroudResult<Vec<u8>> {
        let info = key_info(ctx, name)?;
        let descriptor = KeyDescriptor {
            version: ctx.version_info(),
            info: &info,
        };
        let data = serde_json::to_vec_pretty(&descriptor)
            .with_context(|| format!("serialize runtime key \"{}\"", name))?;
        Ok(data)
    }

    fn generate_runtime(&mut self, ctx: &Context, output: &Path) -> ShroudResult<Vec<u8>> {
        fs::create_dir_all(output)?;

        let keyfile = ctx.runtime_keyfile()?;
        let manifest = RuntimeManifest {
            version: ctx.version_info(),
            platforms: ctx.target_platforms()?,
            keyfile: keyfile.clone(),
            outer: ctx.runtime_outer()?,
            relative_import: ctx.option("relative_import"),
        };
        let path = output.join(RUNTIME_MANIFEST);
        Self::write_json(&path, &manifest)?;
        debug!("write {}", path.display());

        self.generate_runtime_key(ctx, &keyfile)
    }

    fn process(
        &mut self,
        ctx: &Context,
        options: &NormalizedOptions,
        pack: Option<&str>,
    ) -> ShroudResult<()> {
        let inputs = options.list("inputs");
        for input in inputs {
            if !ctx.workdir().join(input).exists() {
                return Err(ShroudError::domain(format!(
                    "input \"{}\" does not exist",
                    input
                )));
            }
        }

        let output = output_dir(ctx, options)?;
        fs::create_dir_all(&output)?;
        info!("process {} input(s) to \"{}\"", inputs.len(), output.display());

        let manifest = BuildManifest {
            version: ctx.version_info(),
            inputs,
            pack,
            options,
        };
        Self::write_json(&output.join(BUILD_MANIFEST), &manifest)?;

        if !ctx.no_runtime() {
            let key = self.generate_runtime(ctx, &output)?;
            fs::write(output.join(ctx.runtime_keyfile()?), key)?;
        }
        if let Some(bundle) = pack {
            info!("pack obfuscated scripts into \"{}\"", bundle);
        }
        Ok(())
    }
}
