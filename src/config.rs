//! `trellis.toml` loading

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use trellis_cards::CardSettings;
use trellis_core::LayoutConfig;

pub const CONFIG_FILE: &str = "trellis.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub layout: LayoutConfig,
    pub cards: CardSettings,
}

impl TrellisConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.layout.validate().context("invalid [layout] section")?;
        Ok(config)
    }

    /// An explicit path must exist. Otherwise `trellis.toml` under `root` is used when
    /// present, and defaults when not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
