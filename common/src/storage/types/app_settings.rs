use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;

/// User-facing settings persisted as JSON.
///
/// Loading self-heals: missing keys fall back to defaults so older settings
/// files keep working after new keys are introduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub days: u32,
    pub auto_delete: bool,
    pub language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            days: 7,
            auto_delete: false,
            language: "en".to_string(),
        }
    }
}

/// Partial update from the settings endpoint; absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub days: Option<u32>,
    pub auto_delete: Option<bool>,
    pub language: Option<String>,
}

impl AppSettings {
    /// Loads settings, falling back to defaults on a missing or unreadable
    /// file.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "failed to read settings, using defaults");
                }
                return Self::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "settings file is invalid, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        info!(?self, "settings saved");
        Ok(())
    }

    pub fn apply(&self, patch: SettingsPatch) -> Self {
        Self {
            days: patch.days.unwrap_or(self.days),
            auto_delete: patch.auto_delete.unwrap_or(self.auto_delete),
            language: patch.language.unwrap_or_else(|| self.language.clone()),
        }
    }
}

/// Languages offered by the settings endpoint.
pub const SUPPORTED_LANGUAGES: [(&str, &str); 5] = [
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("ja", "Japanese"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = AppSettings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn partial_file_self_heals_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"days": 30}"#).expect("write");

        let settings = AppSettings::load(&path);
        assert_eq!(settings.days, 30);
        assert!(!settings.auto_delete);
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn apply_overrides_only_present_fields() {
        let settings = AppSettings::default();
        let patched = settings.apply(SettingsPatch {
            days: None,
            auto_delete: Some(true),
            language: Some("de".to_string()),
        });
        assert_eq!(patched.days, 7);
        assert!(patched.auto_delete);
        assert_eq!(patched.language, "de");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let settings = AppSettings {
            days: 14,
            auto_delete: true,
            language: "ja".to_string(),
        };
        settings.save(&path).expect("save");
        assert_eq!(AppSettings::load(&path), settings);
    }
}
