//! Persisted settings: the access token and the "show private repos" flag.
//!
//! Stored as JSON in the platform config directory, separate from the cache
//! file so clearing the cache can never take the token with it. The
//! `ACCESS_TOKEN` environment variable overrides the stored token.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const TOKEN_ENV: &str = "ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub access_token: Option<String>,
    /// Opt-out flag: private repositories are included unless disabled.
    #[serde(rename = "_showPrivateRepos")]
    pub show_private_repos: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            access_token: None,
            show_private_repos: true,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = settings_path()?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    "settings file {} is corrupt ({e}); using defaults",
                    path.display()
                );
                Settings::default()
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e).context(format!("failed to read {}", path.display())),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = settings_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Token to authenticate with: the environment override when present,
    /// otherwise the stored one.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token.clone())
    }

    /// Reset everything except the access token to defaults (the
    /// "clear cache" semantics for settings).
    pub fn reset_preserving_token(&mut self) {
        let token = self.access_token.take();
        *self = Settings {
            access_token: token,
            ..Default::default()
        };
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "contributor-stats")
        .context("could not determine a home directory for config/state files")
}

fn settings_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("settings.json"))
}

/// Cache file location, under the state directory where available (Linux),
/// falling back to the data directory elsewhere.
pub fn cache_path() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let dir = dirs
        .state_dir()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| dirs.data_dir().to_path_buf());
    Ok(dir.join("cache.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_token_and_include_private() {
        let settings = Settings::default();
        assert!(settings.access_token.is_none());
        assert!(settings.show_private_repos);
    }

    #[test]
    fn show_private_flag_round_trips_under_its_renamed_field() {
        let settings = Settings {
            access_token: Some("ghp_test".to_string()),
            show_private_repos: false,
        };
        let raw = serde_json::to_string(&settings).unwrap();
        assert!(raw.contains("\"_showPrivateRepos\":false"));

        let parsed: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_show_private_field_reads_as_enabled() {
        let parsed: Settings = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        assert!(parsed.show_private_repos);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let parsed: Settings =
            serde_json::from_str(r#"{"access_token":"t","legacy":1}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("t"));
    }

    #[test]
    fn reset_preserves_only_the_token() {
        let mut settings = Settings {
            access_token: Some("ghp_test".to_string()),
            show_private_repos: false,
        };
        settings.reset_preserving_token();
        assert_eq!(settings.access_token.as_deref(), Some("ghp_test"));
        assert!(settings.show_private_repos);
    }
}
