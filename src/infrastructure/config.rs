use crate::domain::{
    config::SettingsDocument,
    error::{ShroudError, ShroudResult},
};
use anyhow::Context as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Text encoding used to read a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-8 with an optional leading byte order mark
    Utf8Sig,
    Latin1,
}

impl TextEncoding {
    fn decode(self, bytes: Vec<u8>, path: &Path) -> ShroudResult<String> {
        match self {
            TextEncoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
            TextEncoding::Utf8 | TextEncoding::Utf8Sig => {
                let mut text = String::from_utf8(bytes).map_err(|e| {
                    ShroudError::config(format!(
                        "Failed to decode config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                if self == TextEncoding::Utf8Sig && text.starts_with('\u{feff}') {
                    text.remove(0);
                }
                Ok(text)
            }
        }
    }
}

impl FromStr for TextEncoding {
    type Err = ShroudError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(TextEncoding::Utf8Sig),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(ShroudError::usage(format!(
                "unsupported encoding \"{}\", use utf-8, utf-8-sig or latin-1",
                other
            ))),
        }
    }
}

/// File-backed configuration store
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    encoding: TextEncoding,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store; a missing file reads as an empty document
    pub fn load(&self) -> ShroudResult<SettingsDocument> {
        if !self.path.exists() {
            return Ok(SettingsDocument::new());
        }

        let bytes = fs::read(&self.path)
            .with_context(|| format!("read config file {}", self.path.display()))?;
        let content = self.encoding.decode(bytes, &self.path)?;

        toml::from_str(&content).map_err(|e| ShroudError::Config {
            message: format!("Failed to parse config file {}: {}", self.path.display(), e),
        })
    }

    /// Save the store, creating parent directories as needed
    pub fn save(&self, doc: &SettingsDocument) -> ShroudResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(doc).map_err(|e| ShroudError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&self.path, content)
            .with_context(|| format!("write config file {}", self.path.display()))?;
        Ok(())
    }

    /// Delete the backing file. Returns whether anything was removed.
    pub fn clear(&self) -> ShroudResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("remove config file {}", self.path.display()))?;
        Ok(true)
    }
}
