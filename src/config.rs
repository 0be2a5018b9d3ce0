// ⚙️ Configuration
// JSON file with every field optional, then environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SHEET_URL: &str = "CLV_SHEET_URL";
pub const ENV_CREDENTIALS: &str = "CLV_CREDENTIALS";
pub const ENV_SERVER_ADDR: &str = "CLV_SERVER_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Sync target, e.g. `sqlite:///var/lib/clv/sheet.db`. None disables sync.
    pub sheet_url: Option<String>,

    /// Path to the service-account JSON used to open the sheet
    pub credentials_path: Option<PathBuf>,

    /// Worksheet (table) rewritten on every sync
    pub worksheet: String,

    pub server_addr: String,

    /// Suggested file name for CSV downloads
    pub export_file_name: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            sheet_url: None,
            credentials_path: None,
            worksheet: "Sheet1".to_string(),
            server_addr: "0.0.0.0:3000".to_string(),
            export_file_name: "clv_data.csv".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: LedgerConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// File (if given) + environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SHEET_URL).filter(|v| !v.is_empty()) {
            self.sheet_url = Some(url);
        }
        if let Some(path) = lookup(ENV_CREDENTIALS).filter(|v| !v.is_empty()) {
            self.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = lookup(ENV_SERVER_ADDR).filter(|v| !v.is_empty()) {
            self.server_addr = addr;
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.sheet_url.is_some()
    }
}
