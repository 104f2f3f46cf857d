use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Credential and timeout bundle handed to adapters untouched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub timeout_seconds: u64,
    pub token: Option<String>,
    pub certificate_path: Option<String>,
    pub key_path: Option<String>,
    pub ca_certificates_directory: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 20,
            token: None,
            certificate_path: None,
            key_path: None,
            ca_certificates_directory: None,
            attributes: HashMap::new(),
        }
    }
}

impl UserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
