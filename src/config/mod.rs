//! Node configuration module
//!
//! Type-safe configuration loaded with the `config` and `dotenvy` crates. An
//! optional file named by `DVPN_NODE_CONFIG` (TOML, YAML or JSON, picked by
//! extension) is overlaid with environment variables prefixed `DVPN_NODE`,
//! nested values separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use dvpn_node::config::NodeConfig;
//!
//! let config = NodeConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod access_policy;
mod error;
mod logging;
mod node;
mod payment;
mod services;
mod transactor;

pub use access_policy::AccessPolicyConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use node::NodeSection;
pub use payment::PaymentConfig;
pub use services::{LocationSection, LocationSource, OpenvpnSection, ServicesConfig, WireguardSection};
pub use transactor::TransactorConfig;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::application::handlers::payment::{InvoiceEngineConfig, SettlementConfig};
use crate::application::handlers::registry::RegistrarConfig;
use crate::application::NodeOptions;

/// Environment variable naming an optional configuration file.
pub const CONFIG_PATH_VAR: &str = "DVPN_NODE_CONFIG";

const ENV_PREFIX: &str = "DVPN_NODE";

/// Root node configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub transactor: TransactorConfig,

    #[serde(default)]
    pub access_policy: AccessPolicyConfig,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Load configuration from the optional file and the environment
    ///
    /// - `DVPN_NODE__PAYMENT__SETTLEMENT_THRESHOLD=100` -> `payment.settlement_threshold = 100`
    /// - `DVPN_NODE__NODE__CONSUMER_ONLY=true` -> `node.consumer_only = true`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or values cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let file = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load from `file` (if any) overlaid with the environment.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Consumer-only nodes neither register nor run services, so those
    /// sections are not checked for them.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.node.validate()?;
        self.payment.validate()?;
        self.access_policy.validate()?;
        self.logging.validate()?;
        if !self.node.consumer_only {
            self.transactor.validate()?;
            self.services.validate()?;
        }
        Ok(())
    }

    pub fn settlement(&self) -> Result<SettlementConfig, ValidationError> {
        Ok(SettlementConfig {
            accountant: self.payment.accountant()?,
            threshold: self.payment.threshold()?,
            max_wait: self.payment.max_wait_for_settlement()?,
            sweep_interval: self.payment.settlement_sweep_interval(),
        })
    }

    pub fn invoice(&self) -> Result<InvoiceEngineConfig, ValidationError> {
        Ok(InvoiceEngineConfig {
            accountant: self.payment.accountant()?,
            invoice_frequency: self.payment.invoice_frequency(),
            promise_wait_timeout: self.payment.promise_wait_timeout(),
            max_missed_promises: self.payment.max_missed_promises,
        })
    }

    pub fn registrar(&self) -> Result<RegistrarConfig, ValidationError> {
        Ok(RegistrarConfig {
            registry: self.transactor.registry()?,
            accountant: self.payment.accountant()?,
            stake: self.transactor.stake()?,
            max_attempts: self.transactor.max_attempts()?,
            retry_delay: self.transactor.retry_delay(),
        })
    }

    /// Resolves the node bootstrap options.
    pub fn to_node_options(&self) -> Result<NodeOptions, ValidationError> {
        let consumer_only = self.node.consumer_only;
        Ok(NodeOptions {
            identity: self.node.identity()?,
            consumer_only,
            price: self.payment.price()?,
            invoice: self.invoice()?,
            settlement: self.settlement()?,
            registrar: if consumer_only { None } else { Some(self.registrar()?) },
            policy_ids: self.access_policy.policy_ids(),
            policy_fetch_interval: self.access_policy.fetch_interval(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::domain::foundation::{Amount, UNITS_PER_TOKEN};
    use crate::domain::market::ServiceType;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const PROVIDER_TOML: &str = r#"
[node]
identity = "0xAbC"
agreed_terms_and_conditions = true

[payment]
accountant_address = "0xacc"
settlement_threshold = 5.0
max_wait_for_settlement_secs = 90

[transactor]
registry_address = "0x4e9"
provider_max_registration_attempts = 3
provider_registration_retry_delay_secs = 5

[services]
active = "openvpn,noop"
dynamic_ports = "40000:40100"

[services.openvpn]
port = 1194
protocol = "tcp"

[services.location]
country = "lt"
"#;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_toml_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_config(".toml", PROVIDER_TOML);

        let config = NodeConfig::load_from(Some(file.path())).unwrap();

        assert!(config.validate().is_ok(), "{:?}", config.validate());
        assert_eq!(config.node.identity().unwrap().as_str(), "0xabc");
        assert_eq!(
            config.services.active_types().unwrap(),
            vec![ServiceType::Openvpn, ServiceType::Noop]
        );
        assert_eq!(config.services.dynamic_ports().unwrap().len(), 101);
    }

    #[test]
    fn test_settlement_config_is_derived_from_payment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_config(".toml", PROVIDER_TOML);
        let config = NodeConfig::load_from(Some(file.path())).unwrap();

        let settlement = config.settlement().unwrap();

        assert_eq!(settlement.accountant.as_str(), "0xacc");
        assert_eq!(settlement.threshold, Amount::from_units(5 * UNITS_PER_TOKEN));
        assert_eq!(settlement.max_wait, Duration::from_secs(90));
    }

    #[test]
    fn test_environment_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_config(".toml", PROVIDER_TOML);
        env::set_var("DVPN_NODE__PAYMENT__SETTLEMENT_THRESHOLD", "100");
        env::set_var("DVPN_NODE__ACCESS_POLICY__FETCH_INTERVAL_SECS", "60");
        let result = NodeConfig::load_from(Some(file.path()));
        env::remove_var("DVPN_NODE__PAYMENT__SETTLEMENT_THRESHOLD");
        env::remove_var("DVPN_NODE__ACCESS_POLICY__FETCH_INTERVAL_SECS");

        let config = result.unwrap();
        assert_eq!(config.payment.settlement_threshold, Some(100.0));
        assert_eq!(config.access_policy.fetch_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_from_json_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_config(
            ".json",
            r#"{"node": {"identity": "0x01", "consumer_only": true},
                "payment": {"accountant_address": "0xacc", "settlement_threshold": 1.5,
                            "max_wait_for_settlement_secs": 30}}"#,
        );

        let config = NodeConfig::load_from(Some(file.path())).unwrap();

        assert!(config.validate().is_ok());
        let options = config.to_node_options().unwrap();
        assert!(options.consumer_only);
        assert!(options.registrar.is_none());
    }

    #[test]
    fn test_provider_options_carry_registration() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = write_config(".toml", PROVIDER_TOML);
        let config = NodeConfig::load_from(Some(file.path())).unwrap();

        let options = config.to_node_options().unwrap();

        let registrar = options.registrar.unwrap();
        assert_eq!(registrar.max_attempts.get(), 3);
        assert_eq!(registrar.retry_delay, Duration::from_secs(5));
        assert_eq!(options.policy_fetch_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = NodeConfig::load_from(Some(&dir.path().join("absent.toml")));

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let config = NodeConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("node.identity"))
        ));
    }
}
