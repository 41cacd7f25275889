//! Application configuration support for repobird.
//!
//! Loads settings from `~/.config/repobird/config.toml` (or platform
//! equivalent, honouring `XDG_CONFIG_HOME`). CLI arguments take precedence
//! over config file values (see `main.rs`).

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration loaded from TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Override the RepoBird API base URL.
    pub api_endpoint: Option<String>,

    /// Default repository to preselect on Dashboard startup.
    pub default_repository: Option<String>,

    /// Emit a terminal bell on important run-status events.
    pub bell: Option<bool>,

    /// Disable OS desktop notifications.
    pub no_notifications: Option<bool>,

    /// Poller tick interval, in seconds, for an active Details view.
    pub poll_interval_secs: Option<u64>,

    /// Age ceiling, in hours, after which the poller stops regardless of
    /// run status (spec §4.2 default: 3).
    pub poll_age_ceiling_hours: Option<i64>,
}

/// Returns the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("repobird").join("config.toml"))
}

const DEFAULT_CONFIG: &str = r#"# RepoBird CLI configuration file
# All fields are optional - CLI arguments override these values

# api_endpoint = "https://api.repobird.ai"
# default_repository = "my-org/my-repo"
# bell = false
# no_notifications = false
# poll_interval_secs = 10
# poll_age_ceiling_hours = 3
"#;

fn create_default_config(path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {e}"))?;
    }
    std::fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| format!("Failed to write config file: {e}"))?;
    eprintln!("Created default config file at {}", path.display());
    Ok(())
}

/// Load configuration from the config file. Creates a default config file
/// if it doesn't exist. Returns default config if the file can't be parsed.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    if !path.exists() {
        if let Err(e) = create_default_config(&path) {
            eprintln!("Warning: {e}");
        }
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to parse config file at {}: {}",
                    path.display(),
                    e
                );
                Config::default()
            }
        },
        Err(e) => {
            eprintln!(
                "Warning: Failed to read config file at {}: {}",
                path.display(),
                e
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.api_endpoint.is_none());
        assert!(config.bell.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
api_endpoint = "https://api.example.com"
default_repository = "acme/widgets"
bell = true
no_notifications = false
poll_interval_secs = 5
poll_age_ceiling_hours = 2
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_endpoint, Some("https://api.example.com".to_string()));
        assert_eq!(config.default_repository, Some("acme/widgets".to_string()));
        assert_eq!(config.bell, Some(true));
        assert_eq!(config.no_notifications, Some(false));
        assert_eq!(config.poll_interval_secs, Some(5));
        assert_eq!(config.poll_age_ceiling_hours, Some(2));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = "bell = true\n";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bell, Some(true));
        assert!(config.api_endpoint.is_none());
    }
}
