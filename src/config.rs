use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::grammar::GrammarRule;
use crate::core::reactor::ReactorSettings;
use crate::core::registry::RegistryParams;
use crate::core::stability::StabilityParams;
use crate::core::strength::BondParams;

/// Engine tuning. Every section is optional in the TOML file; missing fields
/// keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bonding: BondParams,
    pub stability: StabilityParams,
    pub registry: RegistryParams,
    pub reactor: ReactorSettings,
    /// Appended to the built-in grammar rules.
    pub rules: Vec<GrammarRule>,
}

pub fn default_config_path() -> Option<PathBuf> {
    // ~/.tokenbond/engine.toml
    dirs_next::home_dir().map(|h| h.join(".tokenbond").join("engine.toml"))
}

pub fn resolve_config_path(cli_path: &Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = cli_path {
        return Some(p.clone());
    }
    default_config_path()
}

pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Read config {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&text).with_context(|| format!("Parse config {}", path.display()))?;
    Ok(cfg)
}

/// An explicit `--config` must exist; the default path is used only if present.
pub fn load_or_default(cli_path: &Option<PathBuf>) -> Result<EngineConfig> {
    if let Some(p) = cli_path {
        return load_config(p);
    }
    match default_config_path() {
        Some(p) if p.exists() => load_config(&p),
        _ => Ok(EngineConfig::default()),
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Create config parent dir {}", parent.display()))?;
    }
    Ok(())
}
