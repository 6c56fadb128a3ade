//! Client configuration at ~/.config/simple-caldav/config.toml
//!
//! Every key can also be set from the environment with a `SIMPLE_CALDAV_`
//! prefix (e.g. `SIMPLE_CALDAV_URL`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CalDavError, CalDavResult};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ClientConfig {
    /// Calendar collection URL
    pub url: Option<String>,

    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn config_path() -> CalDavResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalDavError::Config("Could not determine config directory".into()))?
            .join("simple-caldav");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default path (if present) layered under the environment.
    pub fn load() -> CalDavResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> CalDavResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("SIMPLE_CALDAV"))
            .build()
            .map_err(|e| CalDavError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalDavError::Config(e.to_string()))
    }

    /// Create a config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalDavResult<()> {
        let contents = "\
# simple-caldav configuration

# Calendar collection to operate on:
# url = \"https://caldav.example.com/calendars/me/personal/\"

# User-Agent sent with every request:
# user_agent = \"simple-caldav\"
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalDavError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalDavError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// The configured URL, or a config error telling the user how to set one.
    pub fn require_url(&self) -> CalDavResult<&str> {
        self.url.as_deref().ok_or_else(|| {
            CalDavError::Config(
                "No calendar URL configured. Pass --url, set SIMPLE_CALDAV_URL, or add `url` to the config file"
                    .into(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = ClientConfig::load_from(Path::new("/nonexistent/simple-caldav/config.toml"));
        assert!(config.is_ok(), "Got: {:?}", config);
    }

    #[test]
    fn test_default_config_is_all_comments() {
        let dir = std::env::temp_dir().join(format!("simple-caldav-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        ClientConfig::create_default_config(&path).unwrap();
        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.user_agent, None);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_require_url() {
        let config = ClientConfig {
            url: Some("https://example.com/cal/".into()),
            user_agent: None,
        };
        assert_eq!(config.require_url().unwrap(), "https://example.com/cal/");
        assert!(ClientConfig::default().require_url().is_err());
    }
}
