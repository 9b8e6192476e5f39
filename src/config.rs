//! # Configuration
//!
//! Layered configuration for the producer and consumer sides, built on the
//! `config` crate. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`config/eventpump.toml`, or `EVENTPUMP_CONFIG_PATH`)
//! 3. `EVENTPUMP_`-prefixed environment variables, `__` separating sections
//!    (e.g. `EVENTPUMP_PRODUCER__EVENT_COUNT=5000`)
//! 4. the variable names used by existing hosting setups
//!    (`EventHubConnectionString`, `EventHubName`, `S3BucketName`)
//!
//! Credentials are never read here; they belong to the transport and storage
//! clients.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EventPumpError, Result};
use crate::producer::DEFAULT_PROBE_CEILING;

pub const DEFAULT_CONFIG_PATH: &str = "config/eventpump.toml";
pub const CONFIG_PATH_ENV: &str = "EVENTPUMP_CONFIG_PATH";
const ENV_PREFIX: &str = "EVENTPUMP";

const LEGACY_VARIABLES: &[(&str, &str)] = &[
    ("EventHubConnectionString", "producer.connection_string"),
    ("EventHubName", "producer.hub_name"),
    ("S3BucketName", "consumer.bucket_name"),
];

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPumpConfig {
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

/// Producer-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Connection string handed to the transport client
    pub connection_string: String,
    /// Target event hub / topic
    pub hub_name: String,
    /// Number of test events to send
    pub event_count: usize,
    /// Size of each test event in bytes; should reflect real message sizes
    pub message_size: usize,
    /// Fixed batch capacity; when unset the capacity is probed
    pub max_batch_events: Option<usize>,
    /// Upper bound on probe iterations
    pub probe_ceiling: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            hub_name: String::new(),
            event_count: 100,
            message_size: 1000,
            max_batch_events: None,
            probe_ceiling: DEFAULT_PROBE_CEILING,
        }
    }
}

/// Consumer-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Destination bucket for archived events
    pub bucket_name: String,
    /// Prefix for generated object keys
    pub key_prefix: String,
    pub region: String,
    /// Items of one group processed concurrently; 1 means sequential
    pub max_in_flight: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            key_prefix: "SampleMessage-".to_string(),
            region: "us-east-1".to_string(),
            max_in_flight: 1,
        }
    }
}

impl EventPumpConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.producer.message_size == 0 {
            return Err(EventPumpError::configuration(
                "producer",
                "message_size must be greater than 0",
            ));
        }
        if self.producer.max_batch_events == Some(0) {
            return Err(EventPumpError::configuration(
                "producer",
                "max_batch_events must be greater than 0 when set",
            ));
        }
        if self.producer.probe_ceiling == 0 {
            return Err(EventPumpError::configuration(
                "producer",
                "probe_ceiling must be greater than 0",
            ));
        }
        if self.consumer.max_in_flight == 0 {
            return Err(EventPumpError::configuration(
                "consumer",
                "max_in_flight must be greater than 0",
            ));
        }
        if self.consumer.key_prefix.is_empty() {
            return Err(EventPumpError::configuration(
                "consumer",
                "key_prefix must not be empty",
            ));
        }
        Ok(())
    }
}

/// Loads and holds a validated [`EventPumpConfig`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: EventPumpConfig,
    source_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default file location (or `EVENTPUMP_CONFIG_PATH`) and
    /// the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(path)
    }

    /// Load from `path` (which may be absent) and the process environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load from `path` and an explicit set of environment variables instead
    /// of the process environment
    pub fn load_with_env(
        path: impl AsRef<Path>,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let mut builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars.clone()),
            );

        for (variable, key) in LEGACY_VARIABLES {
            let value = match &vars {
                Some(vars) => vars.get(*variable).cloned(),
                None => std::env::var(variable).ok(),
            };
            builder = builder.set_override_option(*key, value)?;
        }

        let config: EventPumpConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            path = %path.display(),
            hub_name = %config.producer.hub_name,
            event_count = config.producer.event_count,
            message_size = config.producer.message_size,
            "⚙️ Configuration loaded"
        );

        Ok(Self {
            config,
            source_path: path.to_path_buf(),
        })
    }

    pub fn config(&self) -> &EventPumpConfig {
        &self.config
    }

    pub fn producer(&self) -> &ProducerConfig {
        &self.config.producer
    }

    pub fn consumer(&self) -> &ConsumerConfig {
        &self.config.consumer
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn into_config(self) -> EventPumpConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load_with_env(dir.path().join("missing.toml"), vars(&[])).unwrap();

        assert_eq!(manager.config(), &EventPumpConfig::default());
        assert_eq!(manager.producer().message_size, 1000);
        assert_eq!(manager.consumer().key_prefix, "SampleMessage-");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventpump.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[producer]
hub_name = "telemetry"
event_count = 2500
max_batch_events = 500

[consumer]
bucket_name = "event-archive"
max_in_flight = 8
"#
        )
        .unwrap();

        let manager = ConfigManager::load_with_env(&path, vars(&[])).unwrap();

        assert_eq!(manager.producer().hub_name, "telemetry");
        assert_eq!(manager.producer().event_count, 2500);
        assert_eq!(manager.producer().max_batch_events, Some(500));
        assert_eq!(manager.producer().message_size, 1000);
        assert_eq!(manager.consumer().bucket_name, "event-archive");
        assert_eq!(manager.consumer().max_in_flight, 8);
        assert_eq!(manager.source_path(), path.as_path());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventpump.toml");
        std::fs::write(&path, "[producer]\nevent_count = 10\n").unwrap();

        let manager = ConfigManager::load_with_env(
            &path,
            vars(&[
                ("EVENTPUMP_PRODUCER__EVENT_COUNT", "5000"),
                ("EVENTPUMP_PRODUCER__MESSAGE_SIZE", "256"),
            ]),
        )
        .unwrap();

        assert_eq!(manager.producer().event_count, 5000);
        assert_eq!(manager.producer().message_size, 256);
    }

    #[test]
    fn test_legacy_variable_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load_with_env(
            dir.path().join("missing.toml"),
            vars(&[
                ("EventHubConnectionString", "Endpoint=sb://local/"),
                ("EventHubName", "orders"),
                ("S3BucketName", "orders-archive"),
            ]),
        )
        .unwrap();

        assert_eq!(manager.producer().connection_string, "Endpoint=sb://local/");
        assert_eq!(manager.producer().hub_name, "orders");
        assert_eq!(manager.consumer().bucket_name, "orders-archive");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigManager::load_with_env(
            dir.path().join("missing.toml"),
            vars(&[("EVENTPUMP_PRODUCER__MESSAGE_SIZE", "0")]),
        );

        assert!(matches!(
            result,
            Err(EventPumpError::Configuration { ref component, .. }) if component == "producer"
        ));
    }

    #[test]
    fn test_validate_checks_each_section() {
        let mut config = EventPumpConfig::default();
        assert!(config.validate().is_ok());

        config.producer.max_batch_events = Some(0);
        assert!(config.validate().is_err());

        config.producer.max_batch_events = Some(500);
        config.consumer.max_in_flight = 0;
        assert!(config.validate().is_err());

        config.consumer.max_in_flight = 4;
        config.consumer.key_prefix.clear();
        assert!(config.validate().is_err());
    }
}
