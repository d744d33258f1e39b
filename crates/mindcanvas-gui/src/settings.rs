use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Owner identifier used to scope the map library. Auth lives outside
    /// this app; the demo profile uses a stable local name.
    pub owner: String,
    /// Quiet period before a node text edit is committed.
    pub debounce_ms: u64,
    pub history_capacity: usize,
    pub default_node_color: String,
    /// Color tokens offered by the toolbar swatches.
    pub palette: Vec<String>,
    pub theme: ThemeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ThemeMode {
    Latte,
    Frappe,
    Macchiato,
    #[default]
    Mocha,
}

fn default_palette() -> Vec<String> {
    [
        "#334155", "#7f1d1d", "#9a3412", "#854d0e", "#14532d", "#155e75", "#1e3a8a", "#581c87",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            owner: "local".to_string(),
            debounce_ms: 500,
            history_capacity: 50,
            default_node_color: "#334155".to_string(),
            palette: default_palette(),
            theme: ThemeMode::default(),
        }
    }
}

impl AppSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mindcanvas").join("settings.json"))
    }

    /// Loads settings from disk, falling back to defaults for a missing or
    /// unreadable file.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(?path, %err, "settings file is malformed, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path =
            Self::config_path().ok_or_else(|| anyhow::anyhow!("no config directory available"))?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_fields() {
        let settings: AppSettings = serde_json::from_str(r#"{"owner":"ana"}"#).unwrap();
        assert_eq!(settings.owner, "ana");
        assert_eq!(settings.debounce_ms, 500);
        assert_eq!(settings.history_capacity, 50);
        assert!(!settings.palette.is_empty());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = AppSettings {
            owner: "ana".to_string(),
            theme: ThemeMode::Latte,
            ..AppSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.owner, "ana");
        assert_eq!(back.theme, ThemeMode::Latte);
    }

    #[test]
    fn save_creates_missing_directories_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings {
            debounce_ms: 250,
            theme: ThemeMode::Macchiato,
            ..AppSettings::default()
        };
        settings.save_to(&path).unwrap();

        let back = AppSettings::load_from(&path);
        assert_eq!(back.debounce_ms, 250);
        assert_eq!(back.theme, ThemeMode::Macchiato);
    }

    #[test]
    fn loading_a_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let back = AppSettings::load_from(&dir.path().join("absent.json"));
        assert_eq!(back.owner, "local");
        assert_eq!(back.debounce_ms, 500);
    }
}
