//! Backend configuration.
//!
//! Loaded from a JSON file, with the URL and anon key overridable from the
//! environment so deployments do not have to write secrets to disk.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment variable overriding the backend base URL.
pub const ENV_BACKEND_URL: &str = "TREASURE_BACKEND_URL";
/// Environment variable overriding the anon API key.
pub const ENV_ANON_KEY: &str = "TREASURE_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted backend, no trailing slash.
    pub url: String,
    /// Publishable anon key; also the bearer token while signed out.
    pub anon_key: String,
    #[serde(default = "default_pins_table")]
    pub pins_table: String,
    #[serde(default = "default_photo_bucket")]
    pub photo_bucket: String,
    /// URL login links redirect back to.
    #[serde(default = "default_redirect_to")]
    pub redirect_to: String,
}

fn default_pins_table() -> String {
    "pins".to_string()
}

fn default_photo_bucket() -> String {
    "treasure-photos".to_string()
}

fn default_redirect_to() -> String {
    "http://localhost:8080/".to_string()
}

impl BackendConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env();
        config.url = config.url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Build a config from the environment alone (no file on disk).
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var(ENV_BACKEND_URL)
            .map_err(|_| Error::Config(format!("{ENV_BACKEND_URL} not set")))?;
        let anon_key = std::env::var(ENV_ANON_KEY)
            .map_err(|_| Error::Config(format!("{ENV_ANON_KEY} not set")))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            pins_table: default_pins_table(),
            photo_bucket: default_photo_bucket(),
            redirect_to: default_redirect_to(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            self.url = url;
        }
        if let Ok(key) = std::env::var(ENV_ANON_KEY) {
            self.anon_key = key;
        }
    }

    /// Row API endpoint for the pins table.
    pub fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.pins_table)
    }

    /// Storage endpoint for an object path in the photo bucket.
    pub fn storage_object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, self.photo_bucket, path)
    }

    /// Stable public URL for an object in the photo bucket.
    pub fn storage_public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.url, self.photo_bucket, path
        )
    }

    /// Auth API endpoint.
    pub fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.url, endpoint)
    }

    /// Change-notification stream for the pins table.
    pub fn changes_url(&self) -> String {
        format!("{}/realtime/v1/changes/{}", self.url, self.pins_table)
    }
}
