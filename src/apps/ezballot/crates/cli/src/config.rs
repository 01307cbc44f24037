use anyhow::Result;
use clap::Args;
use confique::Config;
use ezballot_core::KeyLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Utility function to expand $HOME in a PathBuf
pub fn expand_home_in_path(path: &PathBuf) -> Result<PathBuf> {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in path"))?;

    if path_str.contains("$HOME") {
        let expanded = path_str.replace("$HOME", home_dir.to_str().unwrap_or("."));
        Ok(PathBuf::from(expanded))
    } else {
        Ok(path.clone())
    }
}

#[derive(Config, Clone, Default, Serialize, Deserialize)]
#[config(layer_attr(derive(Args, Serialize, Clone)))]
pub struct AppConfig {
    #[config(nested, layer_attr(command(flatten)))]
    pub ledger: LedgerConfig,

    #[config(nested, layer_attr(command(flatten)))]
    pub keys: KeyConfig,
}

#[derive(Clone, Config, Deserialize, Serialize, Default)]
#[config(layer_attr(derive(Args, Clone, Serialize,)))]
pub struct LedgerConfig {
    /// The ledger snapshot file
    #[config(
        env = "EZBALLOT_LEDGER_PATH",
        default = "$HOME/.ezballot/ledger.json",
        layer_attr(arg(long))
    )]
    pub ledger_path: PathBuf,
}

#[derive(Clone, Config, Deserialize, Serialize, Default)]
#[config(layer_attr(derive(Args, Clone, Serialize,)))]
pub struct KeyConfig {
    /// Prefix ledger keys with their entity kind (party:, voter:, election:, vote:)
    #[config(default = false, layer_attr(arg(long)))]
    pub namespaced_keys: bool,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve $HOME placeholders in configuration paths
    pub fn with_resolved_paths(mut self) -> Result<Self> {
        self.ledger.ledger_path = expand_home_in_path(&self.ledger.ledger_path)?;
        Ok(self)
    }

    pub fn key_layout(&self) -> KeyLayout {
        if self.keys.namespaced_keys {
            KeyLayout::Namespaced
        } else {
            KeyLayout::Flat
        }
    }
}
