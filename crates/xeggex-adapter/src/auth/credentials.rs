/*
[INPUT]:  Settings file path (JSON with access_key / secret_key)
[OUTPUT]: Optional API credentials
[POS]:    Auth layer - credential loading for client construction
[UPDATE]: When settings file format or lookup rules change
*/

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{Result, XeggexError};

/// Settings file looked up by default
pub const DEFAULT_SETTINGS_FILE: &str = "xeggex_settings.json";

/// API key pair used for private endpoints
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Load credentials from a settings file.
    ///
    /// A missing file or a missing key yields `Ok(None)`: the client then runs
    /// unauthenticated. A file that exists but cannot be parsed is an error.
    pub fn from_settings_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found; running unauthenticated");
                return Ok(None);
            }
            Err(err) => {
                return Err(XeggexError::Config(format!(
                    "Failed to read settings file {}: {err}",
                    path.display()
                )));
            }
        };

        Self::from_settings_str(&raw)
    }

    /// Parse credentials from settings file contents
    pub fn from_settings_str(raw: &str) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| XeggexError::Config(format!("Invalid settings JSON: {err}")))?;
        let Some(settings) = value.as_object() else {
            return Err(XeggexError::Config(
                "Settings file must contain a JSON object".to_string(),
            ));
        };

        let access_key = settings_key(settings, "access_key")?;
        let secret_key = settings_key(settings, "secret_key")?;

        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Some(Self::new(access_key, secret_key))),
            _ => {
                warn!("settings file lacks access_key or secret_key; running unauthenticated");
                Ok(None)
            }
        }
    }
}

fn settings_key<'a>(
    settings: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(XeggexError::Config(format!("Settings key '{key}' must be a string"))),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
