//! Support for application configuration
//!
//! Server settings are an explicit value handed to the [`Client`](crate::client::Client)
//! constructor, not process-wide state.

use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_calendar_name() -> String {
    "Tasks".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root URL of the CalDAV server (e.g. `https://cloud.example.com/remote.php/dav/`)
    pub server_url: String,
    pub username: String,
    pub password: String,
    /// Display name of the calendar holding the tasks
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
}

impl Config {
    /// Initialize a configuration from the content of a valid JSON file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let config = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            }
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(config)
    }

    /// Initialize a configuration from `TASKDAV_*` environment variables
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let server_url = std::env::var("TASKDAV_URL")
            .map_err(|_| "The TASKDAV_URL environment variable is not set")?;
        let username = std::env::var("TASKDAV_USERNAME").unwrap_or_default();
        let password = std::env::var("TASKDAV_PASSWORD").unwrap_or_default();
        let calendar_name =
            std::env::var("TASKDAV_CALENDAR_NAME").unwrap_or_else(|_| default_calendar_name());

        Ok(Self {
            server_url,
            username,
            password,
            calendar_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "server_url": "https://cloud.example.com/remote.php/dav/",
                "username": "john",
                "password": "secret"
            }"#,
        )
        .unwrap();

        assert_eq!(config.username, "john");
        // Unspecified calendar name falls back to the default
        assert_eq!(config.calendar_name, "Tasks");
    }
}
