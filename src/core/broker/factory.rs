use std::sync::Arc;
use tracing::{debug, warn};

use super::plugins::{BenchmarkBroker, DataBroker, FastestQueueBroker, NoCacheChecker, NullBroker, RandomBroker};
use super::traits::{BrokerPlugin, CacheChecker};
use crate::error::{GridError, Result};

pub const BUILTIN_BROKERS: &[&str] = &["null", "fastestqueue", "benchmark", "random", "data"];

/// Creates broker plugins by name
pub struct BrokerFactory {
    cache_checker: Arc<dyn CacheChecker>,
}

impl Default for BrokerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerFactory {
    pub fn new() -> Self {
        Self {
            cache_checker: Arc::new(NoCacheChecker),
        }
    }

    /// Cache side query used by the data broker
    pub fn with_cache_checker(mut self, checker: Arc<dyn CacheChecker>) -> Self {
        self.cache_checker = checker;
        self
    }

    /// Accepts a bare name or `name:argument`
    pub fn is_known(spec: &str) -> bool {
        let (name, _) = split_spec(spec);
        BUILTIN_BROKERS.contains(&name.as_str())
    }

    pub fn create(&self, name: &str, argument: Option<&str>) -> Result<Box<dyn BrokerPlugin>> {
        let (name, inline_argument) = split_spec(name);
        let argument = argument.or(inline_argument.as_deref());
        debug!("🏭 Creating broker: {} (argument: {:?})", name, argument);

        match name.as_str() {
            "null" => Ok(Box::new(NullBroker::new())),
            "fastestqueue" => Ok(Box::new(FastestQueueBroker::new())),
            "benchmark" => Ok(Box::new(BenchmarkBroker::new(argument))),
            "random" => Ok(Box::new(match argument.and_then(|a| a.parse().ok()) {
                Some(seed) => RandomBroker::with_seed(seed),
                None => RandomBroker::new(),
            })),
            "data" => Ok(Box::new(DataBroker::new(self.cache_checker.clone()))),
            other => {
                warn!("🔧 Unknown broker requested: {}", other);
                Err(GridError::ConfigError(format!("Unknown broker: {}", other)))
            }
        }
    }
}

fn split_spec(spec: &str) -> (String, Option<String>) {
    match spec.split_once(':') {
        Some((name, argument)) => (name.trim().to_lowercase(), Some(argument.trim().to_string())),
        None => (spec.trim().to_lowercase(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_builtin_brokers() {
        let factory = BrokerFactory::new();
        for name in BUILTIN_BROKERS {
            let broker = factory.create(name, None).unwrap();
            assert_eq!(broker.name(), *name);
        }
    }

    #[test]
    fn test_names_are_case_insensitive_with_inline_argument() {
        assert!(BrokerFactory::is_known("FastestQueue"));
        assert!(BrokerFactory::is_known("Benchmark:specfp2000"));
        assert!(!BrokerFactory::is_known("cheapest"));

        let broker = BrokerFactory::new().create("Benchmark:specfp2000", None).unwrap();
        assert_eq!(broker.name(), "benchmark");
    }

    #[test]
    fn test_unknown_broker_is_config_error() {
        assert!(matches!(
            BrokerFactory::new().create("cheapest", None),
            Err(GridError::ConfigError(_))
        ));
    }
}
