//! Per-invocation working context.
//!
//! One [`Context`] exists per command run. Stages write to it as follows:
//!
//! - path fields (`home`, `workdir`) are fixed by the resolver at construction
//! - the override layer is written only through [`Context::push`]
//! - the validator and handlers only read
//!
//! Settings are layered lowest first: built-in defaults, global store, local
//! store, then the invocation overrides. Overrides are never rolled back
//! within a run.

use crate::domain::{
    config::{LayeredSettings, OuterKeyInfo, SettingsDocument, BUILDER_SECTION, RUNTIME_SECTION},
    error::{ShroudError, ShroudResult},
    options::{Feature, NormalizedOptions, OptionValue},
};
use crate::infrastructure::config::ConfigStore;
use std::cell::OnceCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the home path
pub const HOME_ENV: &str = "SHROUD_HOME";
/// Home path used when neither the flag nor the environment set one
pub const DEFAULT_HOME: &str = "~/.shroud";
/// Per-project settings directory, relative to the working directory
pub const LOCAL_DIR: &str = ".shroud";

/// Resolve the home path: explicit flag, then environment, then default.
///
/// The chosen value has `~` and `$VAR` / `${VAR}` references expanded and is
/// made absolute against `workdir`.
pub fn resolve_home(
    flag: Option<&str>,
    env_value: Option<&str>,
    workdir: &Path,
) -> ShroudResult<PathBuf> {
    let raw = flag
        .filter(|value| !value.is_empty())
        .or_else(|| env_value.filter(|value| !value.is_empty()))
        .unwrap_or(DEFAULT_HOME);

    let expanded = expand_vars(&expand_user(raw)?, |name| std::env::var(name).ok());
    Ok(absolutize(Path::new(&expanded), workdir))
}

fn expand_user(path: &str) -> ShroudResult<String> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        // `~user` forms are left alone
        _ => return Ok(path.to_string()),
    };

    let home = dirs::home_dir()
        .ok_or_else(|| ShroudError::config("Could not determine home directory"))?;
    Ok(format!("{}{}", home.display(), rest))
}

/// Expand `$NAME` and `${NAME}`; unknown variables are kept verbatim
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => output.push_str(&value),
            _ => output.push_str(&rest[pos..pos + 1 + consumed]),
        }
        if consumed == 0 && name.is_empty() {
            // lone `$`, keep it and move on
            rest = after;
            continue;
        }
        rest = &after[consumed..];
    }
    output.push_str(rest);
    output
}

/// Join onto `base` when relative and fold `.` / `..` lexically
fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Truthiness of a persisted string value
fn setting_is_true(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Working context of one command run
#[derive(Debug)]
pub struct Context {
    home: PathBuf,
    workdir: PathBuf,
    persisted: OnceCell<LayeredSettings>,
    overrides: NormalizedOptions,
}

impl Context {
    pub fn new(home: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            workdir: workdir.into(),
            persisted: OnceCell::new(),
            overrides: NormalizedOptions::new(),
        }
    }

    pub fn version_info(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn global_config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn local_dir(&self) -> PathBuf {
        self.workdir.join(LOCAL_DIR)
    }

    pub fn local_config_path(&self) -> PathBuf {
        self.local_dir().join("config.toml")
    }

    /// Private settings of one module or package
    pub fn private_config_path(&self, name: &str) -> PathBuf {
        self.local_dir().join(format!("{}.toml", name))
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.home.join("keys")
    }

    pub fn license_dir(&self) -> PathBuf {
        self.home.join("license")
    }

    /// Platform of the running machine, e.g. `linux.x86_64`
    pub fn native_platform() -> String {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        format!("{}.{}", os, std::env::consts::ARCH)
    }

    /// Overlay options on top of the current state for the rest of the run
    pub fn push(&mut self, options: &NormalizedOptions) {
        for (key, value) in options.iter() {
            self.overrides.insert(key, value.clone());
        }
    }

    pub fn overrides(&self) -> &NormalizedOptions {
        &self.overrides
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.overrides.get(key)
    }

    /// Persisted layers, loaded on first use
    pub fn settings(&self) -> ShroudResult<&LayeredSettings> {
        if let Some(settings) = self.persisted.get() {
            return Ok(settings);
        }

        let global = ConfigStore::new(self.global_config_path()).load()?;
        let local = ConfigStore::new(self.local_config_path()).load()?;
        debug!(
            "loaded settings from {} and {}",
            self.global_config_path().display(),
            self.local_config_path().display()
        );

        let layered = LayeredSettings::new(vec![SettingsDocument::defaults(), global, local]);
        Ok(self.persisted.get_or_init(|| layered))
    }

    pub fn setting(&self, section: &str, option: &str) -> ShroudResult<Option<String>> {
        Ok(self.settings()?.get(section, option).map(str::to_string))
    }

    /// File name of the runtime key inside a runtime package
    pub fn runtime_keyfile(&self) -> ShroudResult<String> {
        Ok(self
            .setting(RUNTIME_SECTION, "keyfile")?
            .unwrap_or_else(|| "shroud.rkey".to_string()))
    }

    /// Default name of a standalone outer key
    pub fn runtime_keyid(&self) -> ShroudResult<String> {
        match self.setting(RUNTIME_SECTION, "outer_keyname")? {
            Some(name) => Ok(name),
            None => self.runtime_keyfile(),
        }
    }

    /// Target platforms requested for this run or configured persistently
    pub fn runtime_platforms(&self) -> ShroudResult<Vec<String>> {
        if let Some(platforms) = self.option("platforms").and_then(OptionValue::as_list) {
            return Ok(platforms.to_vec());
        }
        Ok(self
            .setting(RUNTIME_SECTION, "platforms")?
            .map(|value| {
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Configured target platforms, or the native platform alone
    pub fn target_platforms(&self) -> ShroudResult<Vec<String>> {
        let platforms = self.runtime_platforms()?;
        if platforms.is_empty() {
            Ok(vec![Self::native_platform()])
        } else {
            Ok(platforms)
        }
    }

    pub fn feature_enabled(&self, feature: Feature) -> ShroudResult<bool> {
        if let Some(value) = self.option(feature.option_key()) {
            return Ok(value.is_truthy());
        }
        Ok(self
            .setting(BUILDER_SECTION, feature.option_key())?
            .map(|value| setting_is_true(&value))
            .unwrap_or(false))
    }

    /// Outer key reference, from this run or from persisted settings
    pub fn runtime_outer(&self) -> ShroudResult<Option<String>> {
        if let Some(outer) = self.option("outer").and_then(OptionValue::as_text) {
            return Ok(Some(outer.to_string()));
        }
        Ok(self
            .setting(RUNTIME_SECTION, "outer")?
            .filter(|value| !value.is_empty()))
    }

    pub fn no_runtime(&self) -> bool {
        self.overrides.flag("no_runtime")
    }

    fn outer_info_path(&self, name: &str) -> PathBuf {
        self.keys_dir().join(format!("{}.toml", name))
    }

    /// Metadata of a previously generated outer key, `None` if unknown
    pub fn read_outer_info(&self, name: &str) -> ShroudResult<Option<OuterKeyInfo>> {
        let path = self.outer_info_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map(Some).map_err(|e| ShroudError::Config {
            message: format!("Failed to parse outer key info {}: {}", path.display(), e),
        })
    }

    pub fn save_outer_info(&self, info: &OuterKeyInfo) -> ShroudResult<PathBuf> {
        let path = self.outer_info_path(&info.name);
        fs::create_dir_all(self.keys_dir())?;
        let content = toml::to_string_pretty(info).map_err(|e| ShroudError::Config {
            message: format!("Failed to serialize outer key info: {}", e),
        })?;
        fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(entries: &[(&str, OptionValue)]) -> NormalizedOptions {
        let mut options = NormalizedOptions::new();
        for (key, value) in entries {
            options.insert(key, value.clone());
        }
        options
    }

    #[test]
    fn test_home_precedence() {
        let workdir = Path::new("/work");
        assert_eq!(
            resolve_home(Some("/flag/home"), Some("/env/home"), workdir).unwrap(),
            PathBuf::from("/flag/home")
        );
        assert_eq!(
            resolve_home(None, Some("/env/home"), workdir).unwrap(),
            PathBuf::from("/env/home")
        );

        let default = resolve_home(None, None, workdir).unwrap();
        assert!(default.is_absolute());
        assert!(default.ends_with(".shroud"));
    }

    #[test]
    fn test_relative_home_is_absolute() {
        let home = resolve_home(Some("./build/../home"), None, Path::new("/work")).unwrap();
        assert_eq!(home, PathBuf::from("/work/home"));
    }

    #[test]
    fn test_expand_vars() {
        let lookup = |name: &str| (name == "BASE").then(|| "/opt".to_string());
        assert_eq!(expand_vars("$BASE/shroud", lookup), "/opt/shroud");
        assert_eq!(expand_vars("${BASE}x", lookup), "/optx");
        assert_eq!(expand_vars("$MISSING/a", lookup), "$MISSING/a");
        assert_eq!(expand_vars("cost$", lookup), "cost$");
        assert_eq!(expand_vars("${BASE", lookup), "${BASE");
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut ctx = Context::new("/home/.shroud", "/work");
        let overlay = options(&[
            ("mix_str", OptionValue::Flag(true)),
            ("outer", OptionValue::Text("app.rkey".into())),
        ]);

        ctx.push(&overlay);
        let once = ctx.overrides().clone();
        ctx.push(&overlay);
        assert_eq!(ctx.overrides(), &once);
    }

    #[test]
    fn test_push_layers_monotonically() {
        let mut ctx = Context::new("/home/.shroud", "/work");
        ctx.push(&options(&[("outer", OptionValue::Text("first".into()))]));
        ctx.push(&options(&[("mix_str", OptionValue::Flag(true))]));

        assert_eq!(ctx.option("outer"), Some(&OptionValue::Text("first".into())));
        assert!(ctx.overrides().flag("mix_str"));
    }

    #[test]
    fn test_layer_precedence() {
        let home = TempDir::new().unwrap();
        let workdir = TempDir::new().unwrap();
        let mut ctx = Context::new(home.path(), workdir.path());

        let mut global = SettingsDocument::new();
        global.set(RUNTIME_SECTION, "outer_keyname", "global.rkey");
        global.set(BUILDER_SECTION, "enable_jit", "1");
        ConfigStore::new(ctx.global_config_path()).save(&global).unwrap();

        let mut local = SettingsDocument::new();
        local.set(RUNTIME_SECTION, "outer_keyname", "local.rkey");
        ConfigStore::new(ctx.local_config_path()).save(&local).unwrap();

        assert_eq!(ctx.runtime_keyid().unwrap(), "local.rkey");
        assert_eq!(ctx.runtime_keyfile().unwrap(), "shroud.rkey");
        assert!(ctx.feature_enabled(Feature::Jit).unwrap());

        ctx.push(&options(&[("enable_jit", OptionValue::Flag(false))]));
        assert!(!ctx.feature_enabled(Feature::Jit).unwrap());
    }

    #[test]
    fn test_platforms() {
        let home = TempDir::new().unwrap();
        let mut ctx = Context::new(home.path(), home.path());
        assert_eq!(ctx.target_platforms().unwrap(), vec![Context::native_platform()]);

        ctx.push(&options(&[(
            "platforms",
            OptionValue::List(vec!["windows.x86_64".into(), "windows.x86".into()]),
        )]));
        assert_eq!(ctx.target_platforms().unwrap(), vec!["windows.x86_64", "windows.x86"]);
    }

    #[test]
    fn test_runtime_outer_from_settings() {
        let home = TempDir::new().unwrap();
        let mut global = SettingsDocument::new();
        global.set(RUNTIME_SECTION, "outer", "saved.rkey");
        ConfigStore::new(home.path().join("config.toml")).save(&global).unwrap();

        let mut ctx = Context::new(home.path(), home.path());
        assert_eq!(ctx.runtime_outer().unwrap().as_deref(), Some("saved.rkey"));

        ctx.push(&options(&[("outer", OptionValue::Text("cli.rkey".into()))]));
        assert_eq!(ctx.runtime_outer().unwrap().as_deref(), Some("cli.rkey"));
    }

    #[test]
    fn test_outer_info_roundtrip() {
        let home = TempDir::new().unwrap();
        let ctx = Context::new(home.path(), home.path());
        assert!(ctx.read_outer_info("app.rkey").unwrap().is_none());

        let info = OuterKeyInfo {
            name: "app.rkey".into(),
            expired: Some("2027-01-01".into()),
            period: None,
            devices: vec!["mac:00".into()],
            platforms: Vec::new(),
        };
        ctx.save_outer_info(&info).unwrap();
        assert_eq!(ctx.read_outer_info("app.rkey").unwrap(), Some(info));
    }

    #[test]
    fn test_native_platform_shape() {
        let platform = Context::native_platform();
        let (os, arch) = platform.split_once('.').unwrap();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
    }
}
