//! Server settings
//!
//! Loads settings from an optional TOML file with documented defaults.
//! Command line values take precedence over file values, file values over
//! defaults.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8765;

/// Default greeting sent to each client on connect
pub const DEFAULT_GREETING: &str = "Hello from rust";

/// Errors that can occur during settings operations
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Greeting sent to each client on connect
    pub greeting: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Apply command line overrides on top of the loaded values
    pub fn apply_overrides(
        &mut self,
        bind: Option<String>,
        port: Option<u16>,
        greeting: Option<String>,
    ) {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(greeting) = greeting {
            self.greeting = greeting;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.toml");
        std::fs::write(
            &path,
            "bind = \"0.0.0.0\"\nport = 9000\ngreeting = \"Welcome\"\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.bind, "0.0.0.0");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.greeting, "Welcome");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.toml");
        std::fs::write(&path, "port = 9000\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greet.toml");
        std::fs::write(&path, "port = \"not a number\"\n").unwrap();

        let result = Settings::load(&path);
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut settings = Settings::default();
        settings.apply_overrides(Some("0.0.0.0".to_string()), Some(0), None);

        assert_eq!(settings.bind, "0.0.0.0");
        assert_eq!(settings.port, 0);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
    }
}
