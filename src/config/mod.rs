pub mod app_config;
pub mod user_config;

pub use app_config::{
    AdapterSettings, BrokerSettings, ConfigManager, DiscoveryConfiguration, DiscoverySettings,
    EndpointConfig, LoggingConfig,
};
pub use user_config::UserConfig;
