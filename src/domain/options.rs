use serde::Serialize;
use std::collections::BTreeMap;

/// Value of a single normalized generation option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    /// Truthiness as the generation engine reads it
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Flag(value) => *value,
            OptionValue::Int(value) => *value != 0,
            OptionValue::Text(value) => !value.is_empty(),
            OptionValue::List(values) => !values.is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(value) => Some(*value),
            OptionValue::Flag(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(values) => Some(values),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Flag(value) => write!(f, "{}", value),
            OptionValue::Int(value) => write!(f, "{}", value),
            OptionValue::Text(value) => write!(f, "{}", value),
            OptionValue::List(values) => write!(f, "{}", values.join(" ")),
        }
    }
}

/// Canonical request for the generate command.
///
/// Holds an entry only for options the operator actually supplied, plus the
/// entries the derived rules add. A missing key means "not specified", which
/// is not the same thing as a key holding `false` or `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedOptions {
    entries: BTreeMap<String, OptionValue>,
}

impl NormalizedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: &str, value: OptionValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True when the option is present and truthy
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(OptionValue::is_truthy).unwrap_or(false)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_text)
    }

    pub fn list(&self, key: &str) -> &[String] {
        self.get(key).and_then(OptionValue::as_list).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Optional obfuscation features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Jit,
    Bcc,
    Rft,
    Themida,
}

impl Feature {
    pub const ALL: [Feature; 4] = [Feature::Jit, Feature::Bcc, Feature::Rft, Feature::Themida];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Jit => "jit",
            Feature::Bcc => "bcc",
            Feature::Rft => "rft",
            Feature::Themida => "themida",
        }
    }

    /// Canonical option key, e.g. `enable_jit`
    pub fn option_key(self) -> &'static str {
        match self {
            Feature::Jit => "enable_jit",
            Feature::Bcc => "enable_bcc",
            Feature::Rft => "enable_rft",
            Feature::Themida => "enable_themida",
        }
    }

    /// Features that only work when every target is a Windows platform
    pub fn windows_only(self) -> bool {
        matches!(self, Feature::Themida)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
