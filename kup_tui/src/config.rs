use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// User-editable settings, persisted as `kup.toml` under the platform
/// config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory binaries are installed into.
    pub bin_path: String,
    /// Target architecture: auto, amd64, arm64.
    pub architecture: String,
    /// Show the equivalent shell command before installing.
    pub show_explanation: bool,
    /// UI color theme: default, dark, light.
    pub theme: String,
    /// Download timeout in seconds.
    pub timeout_secs: u64,
    /// HTTP proxy for downloads; empty means direct.
    pub proxy_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        let home = directories::BaseDirs::new()
            .map(|d| d.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            bin_path: home.join("bin").to_string_lossy().into_owned(),
            architecture: "auto".to_string(),
            show_explanation: true,
            theme: "default".to_string(),
            timeout_secs: 30,
            proxy_url: String::new(),
        }
    }
}

impl Settings {
    /// Load configuration with layering: defaults → config file → `KUP_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(path) = config_file()
            && path.exists()
        {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            settings =
                toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        }

        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.bin_path = expand_tilde(&settings.bin_path);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        let path = config_file().context("cannot determine config directory")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("KUP_BIN_PATH") {
            self.bin_path = v;
        }
        if let Some(v) = get("KUP_ARCHITECTURE") {
            self.architecture = v;
        }
        if let Some(v) = get("KUP_THEME") {
            self.theme = v;
        }
        if let Some(v) = get("KUP_PROXY_URL") {
            self.proxy_url = v;
        }
        if let Some(v) = get("KUP_TIMEOUT")
            && let Ok(secs) = v.parse()
        {
            self.timeout_secs = secs;
        }
        if let Some(v) = get("KUP_SHOW_EXPLANATION") {
            self.show_explanation = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        PathBuf::from(&self.bin_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn proxy(&self) -> Option<String> {
        if self.proxy_url.is_empty() {
            None
        } else {
            Some(self.proxy_url.clone())
        }
    }
}

fn config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kup").map(|d| d.config_dir().join("kup.toml"))
}

pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~')
        && let Some(base) = directories::BaseDirs::new()
    {
        return format!("{}{}", base.home_dir().to_string_lossy(), rest);
    }
    path.to_string()
}
