use anyhow::{anyhow, Result};
use dirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs::{self, File};
use toml;
use tracing::debug;

/// Settings loaded from the TOML config file. Every field is optional; the
/// file may be missing or empty.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub assume_role: Option<String>,
    pub sso: Option<bool>,
    pub sso_region: Option<String>,
    pub mfa_serial: Option<String>,
    pub proxy: Option<String>,
    pub debug: Option<DebugConfig>,
}

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct DebugConfig {
    pub log: Option<PathBuf>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| anyhow!("unable to load config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn default_config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(anyhow!("$XDG_CONFIG_HOME not set"))?;
        let shell_dir = config_dir.join("awscloudshell");
        fs::create_dir_all(&shell_dir)?;
        Ok(shell_dir.join("default_config.toml"))
    }

    pub fn load_default() -> Result<Config> {
        let config_file = Config::default_config_file_path()?;
        if !config_file.exists() {
            debug!(
                path = config_file.display().to_string().as_str(),
                "The default config file does not exist"
            );
            File::create(&config_file)?;
        }
        Config::load(&config_file)
    }
}
