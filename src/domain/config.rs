use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Section holding runtime key and package settings
pub const RUNTIME_SECTION: &str = "runtime";
/// Section holding generation defaults
pub const BUILDER_SECTION: &str = "builder";

/// One persisted configuration store.
///
/// Stored as TOML tables of string values, one table per section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SettingsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in lowest layer
    pub fn defaults() -> Self {
        let mut doc = Self::new();
        doc.set(RUNTIME_SECTION, "keyfile", &default_keyfile());
        doc.set(RUNTIME_SECTION, "outer_keyname", &default_outer_keyname());
        doc.set(BUILDER_SECTION, "output", &default_output());
        doc
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|options| options.get(option))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string());
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Returns whether the section existed
    pub fn remove_section(&mut self, section: &str) -> bool {
        self.sections.remove(section).is_some()
    }

    /// Returns whether the option existed. Empty sections are dropped.
    pub fn remove_option(&mut self, section: &str, option: &str) -> bool {
        let Some(options) = self.sections.get_mut(section) else {
            return false;
        };
        let removed = options.remove(option).is_some();
        if options.is_empty() {
            self.sections.remove(section);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Persisted layers stacked lowest first; later layers win
#[derive(Debug, Clone, Default)]
pub struct LayeredSettings {
    layers: Vec<SettingsDocument>,
}

impl LayeredSettings {
    pub fn new(layers: Vec<SettingsDocument>) -> Self {
        Self { layers }
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(section, option))
    }

    /// Section names present in any layer
    pub fn section_names(&self) -> BTreeSet<&str> {
        self.layers
            .iter()
            .flat_map(|layer| layer.section_names())
            .collect()
    }

    /// Effective options of one section across all layers
    pub fn section(&self, section: &str) -> BTreeMap<&str, &str> {
        let mut merged = BTreeMap::new();
        for options in self.layers.iter().filter_map(|layer| layer.section(section)) {
            for (option, value) in options {
                merged.insert(option.as_str(), value.as_str());
            }
        }
        merged
    }
}

/// Metadata recorded for an outer runtime key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterKeyInfo {
    /// Key name, also the artifact file name
    pub name: String,
    /// Expiry date, if any
    #[serde(default)]
    pub expired: Option<String>,
    /// Periodic check interval in hours
    #[serde(default)]
    pub period: Option<i64>,
    /// Bound devices
    #[serde(default)]
    pub devices: Vec<String>,
    /// Target platforms the key was generated for
    #[serde(default)]
    pub platforms: Vec<String>,
}

fn default_keyfile() -> String {
    "shroud.rkey".to_string()
}

fn default_outer_keyname() -> String {
    "shroud.rkey".to_string()
}

fn default_output() -> String {
    "dist".to_string()
}
