use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the narrator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorSettings {
    pub base_url: String,
    pub model: String,
    /// Never written to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            temperature: 0.7,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NarratorSettings {
    /// Request timeout; a zero in the settings file means the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Overrides fields from a variable lookup (`OPENAI_API_KEY`,
    /// `OPENAI_BASE_URL`, `PESTEL_MODEL`). Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = non_empty("PESTEL_MODEL") {
            self.model = model;
        }
    }
}

pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("pestel_sim");
    path.push("settings.json");
    path
}

/// Reads settings from `path`, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_settings(path: &Path) -> NarratorSettings {
    let Ok(text) = fs::read_to_string(path) else {
        tracing::debug!("no settings file at {}", path.display());
        return NarratorSettings::default();
    };

    match serde_json::from_str(&text) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("ignoring unreadable settings file {}: {}", path.display(), e);
            NarratorSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &NarratorSettings) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
