use crate::core::context::Context;
use crate::domain::config::{LayeredSettings, SettingsDocument};
use crate::domain::error::{ShroudError, ShroudResult};
use crate::infrastructure::config::{ConfigStore, TextEncoding};
use tracing::{info, warn};

/// Which persisted store an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Global,
}

/// Scope plus the optional module or package with private settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTarget {
    pub scope: Scope,
    pub name: Option<String>,
}

impl ConfigTarget {
    pub fn new(global: bool, name: Option<String>) -> ShroudResult<Self> {
        if global && name.is_some() {
            return Err(ShroudError::usage(
                "-p only works with local settings, drop -g",
            ));
        }
        let scope = if global { Scope::Global } else { Scope::Local };
        Ok(Self { scope, name })
    }
}

/// What `shroud cfg` should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigMode {
    Clear,
    Remove {
        section: String,
        options: Vec<String>,
    },
    Show {
        section: Option<String>,
        options: Vec<String>,
    },
    Set {
        section: String,
        assignments: Vec<(String, String)>,
    },
}

impl ConfigMode {
    /// Select the mode from the mutually exclusive flags and positionals
    pub fn from_args(
        clear: bool,
        remove: bool,
        section: Option<String>,
        options: Vec<String>,
    ) -> ShroudResult<Self> {
        if clear {
            if section.is_some() {
                return Err(ShroudError::usage(
                    "--clear takes no section, use -r to remove a section",
                ));
            }
            return Ok(ConfigMode::Clear);
        }

        if let Some(name) = section.as_deref().filter(|name| name.contains('=')) {
            return Err(ShroudError::usage(format!(
                "missing section name before \"{}\"",
                name
            )));
        }

        if remove {
            let section = section.ok_or_else(|| {
                ShroudError::usage("-r needs the section or options to remove")
            })?;
            if let Some(option) = options.iter().find(|option| option.contains('=')) {
                return Err(ShroudError::usage(format!(
                    "-r takes option names only, got \"{}\"",
                    option
                )));
            }
            return Ok(ConfigMode::Remove { section, options });
        }

        let assignments = options.iter().filter(|option| option.contains('=')).count();
        if assignments == 0 {
            return Ok(ConfigMode::Show { section, options });
        }
        if assignments != options.len() {
            return Err(ShroudError::usage(
                "cannot mix option names and \"name=value\" in one command",
            ));
        }

        let section = section.ok_or_else(|| ShroudError::usage("missing section name"))?;
        let assignments = options
            .iter()
            .map(|option| parse_assignment(option))
            .collect::<ShroudResult<Vec<_>>>()?;
        Ok(ConfigMode::Set {
            section,
            assignments,
        })
    }
}

fn parse_assignment(option: &str) -> ShroudResult<(String, String)> {
    let (name, value) = option
        .split_once('=')
        .ok_or_else(|| ShroudError::usage(format!("invalid option \"{}\"", option)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ShroudError::usage(format!("missing option name in \"{}\"", option)));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Result of a show request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigView {
    Sections(Vec<String>),
    Options {
        section: String,
        values: Vec<(String, Option<String>)>,
    },
}

/// Operations on the persisted configuration stores
pub trait Configurer {
    /// Remove the whole store; returns whether anything existed
    fn clear(&mut self, target: &ConfigTarget) -> ShroudResult<bool>;

    /// Remove a section, or only the named options in it
    fn remove(
        &mut self,
        target: &ConfigTarget,
        section: &str,
        options: &[String],
    ) -> ShroudResult<Vec<String>>;

    /// Effective values as seen from the target scope
    fn show(
        &self,
        target: &ConfigTarget,
        section: Option<&str>,
        options: &[String],
    ) -> ShroudResult<ConfigView>;

    fn set(
        &mut self,
        target: &ConfigTarget,
        section: &str,
        assignments: &[(String, String)],
    ) -> ShroudResult<()>;
}

/// Configurer backed by the TOML stores of a context
pub struct ConfigEditor<'a> {
    ctx: &'a Context,
    encoding: TextEncoding,
}

impl<'a> ConfigEditor<'a> {
    pub fn new(ctx: &'a Context, encoding: TextEncoding) -> Self {
        Self { ctx, encoding }
    }

    fn store_at(&self, path: std::path::PathBuf) -> ConfigStore {
        ConfigStore::new(path).with_encoding(self.encoding)
    }

    /// The store an edit writes to
    fn store(&self, target: &ConfigTarget) -> ConfigStore {
        match (target.scope, target.name.as_deref()) {
            (Scope::Global, _) => self.store_at(self.ctx.global_config_path()),
            (Scope::Local, Some(name)) => self.store_at(self.ctx.private_config_path(name)),
            (Scope::Local, None) => self.store_at(self.ctx.local_config_path()),
        }
    }

    /// Layers visible from the target, lowest first
    fn layers(&self, target: &ConfigTarget) -> ShroudResult<LayeredSettings> {
        let mut layers = vec![
            SettingsDocument::defaults(),
            self.store_at(self.ctx.global_config_path()).load()?,
        ];
        if target.scope == Scope::Local {
            layers.push(self.store_at(self.ctx.local_config_path()).load()?);
            if target.name.is_some() {
                layers.push(self.store(target).load()?);
            }
        }
        Ok(LayeredSettings::new(layers))
    }
}

impl Configurer for ConfigEditor<'_> {
    fn clear(&mut self, target: &ConfigTarget) -> ShroudResult<bool> {
        let store = self.store(target);
        let removed = store.clear()?;
        info!("clear configuration file \"{}\"", store.path().display());
        Ok(removed)
    }

    fn remove(
        &mut self,
        target: &ConfigTarget,
        section: &str,
        options: &[String],
    ) -> ShroudResult<Vec<String>> {
        let store = self.store(target);
        let mut doc = store.load()?;
        let mut removed = Vec::new();

        if options.is_empty() {
            if doc.remove_section(section) {
                removed.push(section.to_string());
            }
        } else {
            for option in options {
                if doc.remove_option(section, option) {
                    removed.push(format!("{}.{}", section, option));
                } else {
                    warn!("no option \"{}\" in section \"{}\"", option, section);
                }
            }
        }

        if removed.is_empty() {
            warn!("nothing removed from \"{}\"", store.path().display());
        } else {
            if doc.is_empty() {
                store.clear()?;
            } else {
                store.save(&doc)?;
            }
            info!("remove {} from \"{}\"", removed.join(", "), store.path().display());
        }
        Ok(removed)
    }

    fn show(
        &self,
        target: &ConfigTarget,
        section: Option<&str>,
        options: &[String],
    ) -> ShroudResult<ConfigView> {
        let layers = self.layers(target)?;

        let Some(section) = section else {
            return Ok(ConfigView::Sections(
                layers.section_names().into_iter().map(str::to_string).collect(),
            ));
        };

        let values = if options.is_empty() {
            layers
                .section(section)
                .into_iter()
                .map(|(option, value)| (option.to_string(), Some(value.to_string())))
                .collect()
        } else {
            options
                .iter()
                .map(|option| {
                    let value = layers.get(section, option).map(str::to_string);
                    (option.clone(), value)
                })
                .collect()
        };

        Ok(ConfigView::Options {
            section: section.to_string(),
            values,
        })
    }

    fn set(
        &mut self,
        target: &ConfigTarget,
        section: &str,
        assignments: &[(String, String)],
    ) -> ShroudResult<()> {
        let store = self.store(target);
        let mut doc = store.load()?;
        for (option, value) in assignments {
            doc.set(section, option, value);
        }
        store.save(&doc)?;
        for (option, value) in assignments {
            info!("change option \"{}.{}\" to \"{}\"", section, option, value);
        }
        Ok(())
    }
}
