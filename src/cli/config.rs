//! SC-016: Optional `samc.toml` project configuration.

use clap::ValueEnum;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "samc.toml";
pub const DEFAULT_TEMPLATE: &str = "template.yaml";

/// Output encoding for `samc compile`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Contents of `samc.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Template path, relative to the config file
    #[serde(default)]
    pub template: Option<PathBuf>,

    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Parameter overrides; non-string values are stringified
    #[serde(default)]
    pub parameters: BTreeMap<String, toml::Value>,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl ProjectConfig {
    /// Load a config file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no project config");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| format!("invalid {}: {}", path.display(), e))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Template path with the config directory applied.
    pub fn template_path(&self) -> Option<PathBuf> {
        self.template.as_ref().map(|t| self.base_dir.join(t))
    }

    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}
