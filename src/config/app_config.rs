use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::user_config::UserConfig;
use crate::core::broker::factory::BrokerFactory;
use crate::domain::entities::{CapabilityKind, Endpoint};
use crate::error::{GridError, Result};

/// Main discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryConfiguration {
    pub logging: LoggingConfig,
    pub discovery: DiscoverySettings,
    pub adapters: AdapterSettings,
    pub broker: BrokerSettings,
    pub services: Vec<EndpointConfig>,
    pub credentials: UserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "json", "pretty" or anything else for plain output
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Upper bound on simultaneously running queries; unbounded when unset
    pub max_concurrent_queries: Option<usize>,
    pub preferred_interfaces: Vec<String>,
    pub rejected_discovery_urls: Vec<String>,
    pub capability_filter: Vec<String>,
    pub recursive: bool,
    pub report_no_info_returned: bool,
    /// Submission interfaces targets are restricted to; empty means any
    pub requested_submission_interfaces: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_concurrent_queries: None,
            preferred_interfaces: vec!["org.nordugrid.arcrest".to_string()],
            rejected_discovery_urls: Vec::new(),
            capability_filter: Vec::new(),
            recursive: true,
            report_no_info_returned: false,
            requested_submission_interfaces: Vec::new(),
        }
    }
}

/// Adapter tables in priority order, one per result kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterSettings {
    pub registry: Vec<String>,
    pub info: Vec<String>,
    pub job_list: Vec<String>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            registry: vec![
                "org.nordugrid.file".to_string(),
                "org.nordugrid.emir".to_string(),
            ],
            info: vec![
                "org.nordugrid.file".to_string(),
                "org.nordugrid.arcrest".to_string(),
            ],
            job_list: vec![
                "org.nordugrid.file".to_string(),
                "org.nordugrid.arcrest".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub name: String,
    pub argument: Option<String>,
    pub reject_targets: Vec<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            name: "fastestqueue".to_string(),
            argument: None,
            reject_targets: Vec::new(),
        }
    }
}

/// Seed endpoint as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub kind: CapabilityKind,
    #[serde(default)]
    pub service_id: Option<String>,
}

impl EndpointConfig {
    pub fn to_endpoint(&self) -> Endpoint {
        let mut endpoint = Endpoint::new(self.url.clone()).with_kind(self.kind);
        if let Some(interface) = &self.interface {
            endpoint = endpoint.with_interface(interface.clone());
        }
        if let Some(service_id) = &self.service_id {
            endpoint = endpoint.with_service_id(service_id.clone());
        }
        endpoint
    }
}

impl DiscoveryConfiguration {
    pub fn seed_endpoints(&self) -> Vec<Endpoint> {
        self.services.iter().map(|s| s.to_endpoint()).collect()
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: Arc<RwLock<DiscoveryConfiguration>>,
    config_path: Option<String>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(DiscoveryConfiguration::default())),
            config_path: None,
        }
    }

    /// Load configuration from an optional config file, then environment overrides
    pub async fn load(&mut self) -> Result<()> {
        let mut config = DiscoveryConfiguration::default();

        if let Ok(config_path) = std::env::var("GRID_CONFIG_FILE") {
            config = Self::load_from_file(&config_path).await?;
            self.config_path = Some(config_path);
        }

        Self::load_from_env(&mut config);
        Self::validate_config(&config)?;

        let mut current_config = self.config.write().await;
        *current_config = config;

        info!("📋 Configuration loaded successfully");
        Ok(())
    }

    /// Environment variables take precedence over file values
    fn load_from_env(config: &mut DiscoveryConfiguration) {
        if let Ok(level) = std::env::var("GRID_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("GRID_LOG_FORMAT") {
            config.logging.format = format;
        }
        if let Ok(timeout) = std::env::var("GRID_QUERY_TIMEOUT") {
            config.credentials.timeout_seconds =
                timeout.parse().unwrap_or(config.credentials.timeout_seconds);
        }
        if let Ok(limit) = std::env::var("GRID_MAX_CONCURRENT_QUERIES") {
            config.discovery.max_concurrent_queries = limit.parse().ok();
        }
        if let Ok(token) = std::env::var("GRID_TOKEN") {
            config.credentials.token = Some(token);
        }
        if let Ok(broker) = std::env::var("GRID_BROKER") {
            config.broker.name = broker;
        }
        if let Ok(interfaces) = std::env::var("GRID_PREFERRED_INTERFACES") {
            config.discovery.preferred_interfaces = split_list(&interfaces);
        }
        if let Ok(rejected) = std::env::var("GRID_REJECT_DISCOVERY") {
            config.discovery.rejected_discovery_urls = split_list(&rejected);
        }
    }

    pub async fn load_from_file(path: &str) -> Result<DiscoveryConfiguration> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GridError::ConfigError(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config = Self::parse(&content, path)?;

        debug!(path = path, "📁 Configuration loaded from file");
        Ok(config)
    }

    /// Parses config content, picking the format from the path extension
    pub fn parse(content: &str, path: &str) -> Result<DiscoveryConfiguration> {
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(content)
                .map_err(|e| GridError::ConfigError(format!("Invalid YAML config: {}", e)))
        } else if path.ends_with(".json") {
            serde_json::from_str(content)
                .map_err(|e| GridError::ConfigError(format!("Invalid JSON config: {}", e)))
        } else {
            Err(GridError::ConfigError(
                "Config file must be .yaml, .yml, or .json".to_string(),
            ))
        }
    }

    pub fn validate_config(config: &DiscoveryConfiguration) -> Result<()> {
        match config.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(GridError::ConfigError("Invalid log level".to_string())),
        }

        if config.credentials.timeout_seconds == 0 {
            return Err(GridError::ConfigError(
                "Query timeout must be greater than zero".to_string(),
            ));
        }

        if config.discovery.max_concurrent_queries == Some(0) {
            return Err(GridError::ConfigError(
                "max_concurrent_queries must be greater than zero".to_string(),
            ));
        }

        if !BrokerFactory::is_known(&config.broker.name) {
            return Err(GridError::ConfigError(format!(
                "Unknown broker: {}",
                config.broker.name
            )));
        }

        if let Some(service) = config.services.iter().find(|s| s.url.trim().is_empty()) {
            return Err(GridError::ConfigError(format!(
                "Service endpoint with empty URL (kind {})",
                service.kind
            )));
        }

        debug!("✅ Configuration validation passed");
        Ok(())
    }

    pub async fn get(&self) -> DiscoveryConfiguration {
        self.config.read().await.clone()
    }

    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
