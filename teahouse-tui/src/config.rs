use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use teahouse_types::FeedFilter;

use crate::session::SessionStore;

/// Connection settings for the hosted backend. Both values are required.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    /// Build from CLI/env values. Returns `None` when either value is
    /// missing or blank.
    pub fn resolve(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url.map(|u| u.trim().trim_end_matches('/').to_string())?;
        let anon_key = anon_key.map(|k| k.trim().to_string())?;

        if url.is_empty() || anon_key.is_empty() {
            return None;
        }

        Some(Self { url, anon_key })
    }
}

/// Per-user preferences stored locally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub feed_filter: FeedFilter,
}

/// Owns the `.teahouse` directory: preferences and the session file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Config manager rooted at `~/.teahouse`, created if missing
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Self::with_dir(home_dir.join(".teahouse"))
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create .teahouse directory")?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::at(self.config_dir.join("session"))
    }

    fn preferences_file(&self, user_id: Uuid) -> PathBuf {
        self.config_dir.join(format!("prefs_{}.json", user_id))
    }

    pub fn save_preferences(&self, user_id: Uuid, prefs: &UserPreferences) -> Result<()> {
        let json = serde_json::to_string_pretty(prefs).context("Failed to serialize preferences")?;
        fs::write(self.preferences_file(user_id), json)
            .context("Failed to write preferences file")?;
        Ok(())
    }

    pub fn load_preferences(&self, user_id: Uuid) -> Result<Option<UserPreferences>> {
        let prefs_file = self.preferences_file(user_id);

        if !prefs_file.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&prefs_file).context("Failed to read preferences file")?;
        let prefs = serde_json::from_str(&json).context("Failed to parse preferences")?;

        Ok(Some(prefs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backend_config_requires_both_values() {
        assert_eq!(BackendConfig::resolve(None, Some("key".into())), None);
        assert_eq!(BackendConfig::resolve(Some("https://x.test".into()), None), None);
        assert_eq!(
            BackendConfig::resolve(Some("  ".into()), Some("key".into())),
            None
        );

        let config =
            BackendConfig::resolve(Some("https://x.test/ ".into()), Some(" key ".into())).unwrap();
        assert_eq!(config.url, "https://x.test");
        assert_eq!(config.anon_key, "key");
    }

    #[test]
    fn test_preferences_round_trip_per_user() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(temp_dir.path().join("cfg")).unwrap();
        let sara = Uuid::new_v4();
        let omar = Uuid::new_v4();

        assert_eq!(manager.load_preferences(sara).unwrap(), None);

        let prefs = UserPreferences {
            feed_filter: FeedFilter::Trending,
        };
        manager.save_preferences(sara, &prefs).unwrap();

        assert_eq!(manager.load_preferences(sara).unwrap(), Some(prefs));
        assert_eq!(manager.load_preferences(omar).unwrap(), None);
    }

    #[test]
    fn test_session_store_lives_in_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(temp_dir.path()).unwrap();
        assert_eq!(manager.session_store().path(), temp_dir.path().join("session"));
    }
}
