//! Application settings with persistence
//!
//! Settings are saved to `~/.config/chardat/settings.toml`

use std::fs;
use std::path::PathBuf;

use chardat_exchange::ExchangeConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exchange: ExchangeConfig,
    pub demo: DemoSettings,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chardat"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Failed to parse settings: {}, using defaults", e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("settings.toml");
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Directory the blob store lives in
    pub fn storage_dir(&self) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chardat")
            .join(&self.exchange.storage_dir)
    }
}

/// Settings for the capture-and-transfer demo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Id the demo character is stored and sent under
    pub character_id: u32,
    /// Optional parts to give the demo characters, e.g. "Hair"
    pub extra_parts: Vec<String>,
    /// Simulated frame time in milliseconds
    pub frame_millis: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            character_id: 1,
            extra_parts: vec!["Hair".to_string(), "Shoes".to_string()],
            frame_millis: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_toml() {
        let settings = Settings::default();
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed = Settings::parse(&text).unwrap();
        assert_eq!(parsed.exchange, settings.exchange);
        assert_eq!(parsed.demo.extra_parts, settings.demo.extra_parts);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed = Settings::parse(
            r#"
            [exchange]
            chunk_size = 1024

            [[exchange.channels.mappings]]
            technique = "Standard"
            channels = ["_Albedo", "_Mask", "_Normal"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.exchange.chunk_size, 1024);
        assert_eq!(parsed.exchange.session_timeout_secs, 30);
        assert_eq!(parsed.exchange.channels.mappings.len(), 1);
        assert_eq!(parsed.exchange.channels.resolve("Standard")[0], Some("_Albedo"));
        assert_eq!(parsed.demo.character_id, 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Settings::parse("exchange = 3").is_err());
    }
}
