//! Broker engine
//!
//! Filters candidate execution targets against a job requirement, ranks the
//! survivors with a pluggable [`BrokerPlugin`], and serves them one at a time.

pub mod factory;
pub mod matching;
pub mod plugins;
pub mod session;
pub mod traits;

pub use factory::{BrokerFactory, BUILTIN_BROKERS};
pub use matching::generic_match;
pub use plugins::{BenchmarkBroker, DataBroker, FastestQueueBroker, NoCacheChecker, NullBroker, RandomBroker};
pub use session::{Broker, BrokerState};
pub use traits::{BrokerPlugin, CacheChecker};
