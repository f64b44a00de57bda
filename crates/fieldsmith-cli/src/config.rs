use std::fs;
use std::path::Path;

use fieldsmith_generate::{GenerateOptions, OutputFormat};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Settings file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fieldsmith.toml";

/// Defaults read from `fieldsmith.toml`; command-line flags override them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub seed: Option<u64>,
    pub rows: Option<u64>,
    pub parallel: Option<bool>,
    pub format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Generation options with flag values taking precedence.
    pub fn generate_options(
        &self,
        rows: Option<u64>,
        seed: Option<u64>,
        parallel: bool,
    ) -> GenerateOptions {
        let defaults = GenerateOptions::default();
        GenerateOptions {
            rows: rows.or(self.rows).unwrap_or(defaults.rows),
            seed: seed.or(self.seed).unwrap_or(defaults.seed),
            parallel: parallel || self.parallel.unwrap_or(defaults.parallel),
            timestamp: None,
        }
    }

    pub fn output_format(&self, format: Option<OutputFormat>) -> OutputFormat {
        format.or(self.format).unwrap_or_default()
    }
}

/// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] when present.
///
/// An explicit path must exist; a missing default file means built-in defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => read_settings(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read_settings(path)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

fn read_settings(path: &Path) -> Result<Settings, CliError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
