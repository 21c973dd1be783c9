use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::EngineError;
use crate::language::LanguageKind;

/// Name of the optional configuration file at the project root.
pub const CONFIG_FILE: &str = "ccg.toml";

/// Engine configuration loaded from `ccg.toml` at the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Additional path patterns to exclude when walking a directory (beyond .gitignore).
    pub exclude: Vec<String>,
    /// Extension (without the dot) -> language name overrides, e.g. `pyx = "python"`.
    pub languages: BTreeMap<String, String>,
    /// Files larger than this are reported as unreadable instead of parsed.
    pub max_file_bytes: u64,
    /// Signatures are truncated to this many characters.
    pub signature_max_len: usize,
    /// Worker threads for the parallel phases; 0 uses rayon's global pool.
    pub threads: usize,
    /// Emit `References` edges for type annotations and attribute access.
    pub emit_references: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            languages: BTreeMap::new(),
            max_file_bytes: 2 * 1024 * 1024,
            signature_max_len: 200,
            threads: 0,
            emit_references: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ccg.toml` in the given root directory.
    ///
    /// Returns the default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Reject language overrides that name no known language.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (extension, language) in &self.languages {
            if LanguageKind::from_str_loose(language).is_none() {
                return Err(EngineError::UnsupportedLanguage {
                    extension: extension.clone(),
                    language: language.clone(),
                });
            }
        }
        Ok(())
    }
}
