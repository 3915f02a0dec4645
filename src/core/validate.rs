use crate::core::context::Context;
use crate::domain::error::{ShroudError, ShroudResult};
use crate::domain::options::Feature;
use std::path::Path;

/// Check the generate request against the context before any work starts.
///
/// Every rule is evaluated; all violations are reported together as one
/// usage error, one line each.
pub fn check_generate_context(ctx: &Context) -> ShroudResult<()> {
    let mut violations = Vec::new();

    violations.extend(check_windows_features(ctx)?);
    violations.extend(check_no_runtime(ctx)?);
    violations.extend(check_outer_key(ctx)?);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ShroudError::Usage(violations.join("\n")))
    }
}

fn check_windows_features(ctx: &Context) -> ShroudResult<Vec<String>> {
    let platforms = ctx.target_platforms()?;
    let mut violations = Vec::new();

    for feature in Feature::ALL.into_iter().filter(|f| f.windows_only()) {
        if !ctx.feature_enabled(feature)? {
            continue;
        }
        let others: Vec<&str> = platforms
            .iter()
            .map(String::as_str)
            .filter(|platform| !platform.starts_with("windows"))
            .collect();
        if !others.is_empty() {
            violations.push(format!(
                "--enable-{} only works for Windows, but target platform is {}",
                feature,
                others.join(", ")
            ));
        }
    }
    Ok(violations)
}

fn check_no_runtime(ctx: &Context) -> ShroudResult<Option<String>> {
    if ctx.no_runtime() && ctx.runtime_outer()?.is_none() {
        return Ok(Some(
            "--no-runtime needs an outer key, pass it by --outer".to_string(),
        ));
    }
    Ok(None)
}

fn check_outer_key(ctx: &Context) -> ShroudResult<Option<String>> {
    let Some(outer) = ctx.runtime_outer()? else {
        return Ok(None);
    };

    let path = ctx.workdir().join(Path::new(&outer));
    if path.exists() {
        let keyfile = path.join(ctx.runtime_keyfile()?);
        if !keyfile.is_file() {
            return Ok(Some(format!("no runtime key in \"{}\"", outer)));
        }
        return Ok(None);
    }

    if ctx.read_outer_info(&outer)?.is_none() {
        return Ok(Some(format!(
            "no outer key \"{}\" found, please generate it by \"shroud gen key\"",
            outer
        )));
    }
    Ok(None)
}
