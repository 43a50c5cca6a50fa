use crate::error::{PwdbError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";

/// Settings read from `config.json` in the config directory. Every key is
/// optional; command-line flags override what is loaded here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PwdbConfig {
    /// Opened by `new` and `read` when no file is named.
    #[serde(default = "default_database")]
    pub default_database: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment variable holding the database password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Printed in place of sensitive values.
    #[serde(default = "default_mask")]
    pub mask: String,
}

fn default_database() -> PathBuf {
    PathBuf::from("pw.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_password_env() -> String {
    "PWDB_PASSWORD".to_string()
}

fn default_mask() -> String {
    "********".to_string()
}

impl Default for PwdbConfig {
    fn default() -> Self {
        Self {
            default_database: default_database(),
            log_level: default_log_level(),
            password_env: default_password_env(),
            mask: default_mask(),
        }
    }
}

impl PwdbConfig {
    /// Loads `config.json` from `config_dir`, or defaults when there is none.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content)
            .map_err(|e| PwdbError::Config(format!("{}: {}", config_path.display(), e)))
    }

    /// Writes `config.json` into `config_dir`, creating the directory.
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<PathBuf> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let config_path = config_dir.join(CONFIG_FILENAME);
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;
        Ok(config_path)
    }
}
