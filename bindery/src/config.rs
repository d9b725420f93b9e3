//! Bootstrap configuration is created with opinionated default values, which can then be
//! overwritten by environment variables prefixed with `BINDERY_` or `bindery.json` file.
//!
//! The same configuration sources are exposed to the injector as a [ConfigSource], so that
//! configuration lookup declarations can resolve values by key.

use bindery_di::resolver::AnyPtr;
use bindery_di::supplier::Configuration;
use bindery_di::types::Type;
use config::{Config, ConfigError, Environment, File};
use derive_more::Constructor;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const CONFIG_ENV_PREFIX: &str = "BINDERY";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "bindery.json";

/// Bootstrap configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// Should a default tracing logger be installed when bootstrapping.
    pub install_tracing_logger: bool,
    /// Should instances which never expire be created right after building the injector.
    pub eager_singletons: bool,
    /// Should final supplier types be instantiated while expanding declarations, instead of on
    /// each construction.
    pub eager_supplier_substitution: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            eager_singletons: false,
            eager_supplier_substitution: false,
        }
    }
}

impl From<OptionalBootstrapConfig> for BootstrapConfig {
    fn from(value: OptionalBootstrapConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            eager_singletons: value.eager_singletons.unwrap_or(default.eager_singletons),
            eager_supplier_substitution: value
                .eager_supplier_substitution
                .unwrap_or(default.eager_supplier_substitution),
        }
    }
}

impl BootstrapConfig {
    /// Loads the configuration sources from the default file and the environment.
    pub fn load_sources() -> Result<Config, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
    }

    /// Reads bootstrap configuration from the given sources, falling back to defaults for
    /// missing values.
    pub fn from_sources(config: &Config) -> Result<Self, ConfigError> {
        config
            .clone()
            .try_deserialize::<OptionalBootstrapConfig>()
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalBootstrapConfig {
    install_tracing_logger: Option<bool>,
    eager_singletons: Option<bool>,
    eager_supplier_substitution: Option<bool>,
}

/// [Configuration] backed by [Config]. Values are converted according to the requested type:
/// [String], [i64], [f64] and [bool] are supported.
#[derive(Constructor, Clone, Debug)]
pub struct ConfigSource {
    config: Config,
}

impl Configuration for ConfigSource {
    fn value(&self, ty: &Type, key: &str) -> Option<AnyPtr> {
        let value = if ty == &Type::of::<String>() {
            self.config.get_string(key).map(|value| Arc::new(value) as AnyPtr)
        } else if ty == &Type::of::<i64>() {
            self.config.get_int(key).map(|value| Arc::new(value) as AnyPtr)
        } else if ty == &Type::of::<f64>() {
            self.config.get_float(key).map(|value| Arc::new(value) as AnyPtr)
        } else if ty == &Type::of::<bool>() {
            self.config.get_bool(key).map(|value| Arc::new(value) as AnyPtr)
        } else {
            debug!(%ty, key, "Unsupported configuration value type.");
            return None;
        };

        value
            .map_err(|error| debug!(%ty, key, %error, "Missing configuration value."))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{BootstrapConfig, ConfigSource};
    use bindery_di::supplier::Configuration;
    use bindery_di::types::Type;
    use config::Config;

    fn config() -> Config {
        Config::builder()
            .set_override("eager_singletons", true)
            .unwrap()
            .set_override("server.port", 8080)
            .unwrap()
            .set_override("server.host", "localhost")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn should_merge_with_defaults() {
        let config = BootstrapConfig::from_sources(&config()).unwrap();

        assert!(config.eager_singletons);
        assert!(config.install_tracing_logger);
        assert!(!config.eager_supplier_substitution);
    }

    #[test]
    fn should_convert_by_requested_type() {
        let source = ConfigSource::new(config());

        let port = source.value(&Type::of::<i64>(), "server.port").unwrap();
        assert_eq!(*port.downcast::<i64>().unwrap(), 8080);

        let host = source.value(&Type::of::<String>(), "server.host").unwrap();
        assert_eq!(*host.downcast::<String>().unwrap(), "localhost");

        assert!(source.value(&Type::of::<i64>(), "server.host").is_none());
        assert!(source.value(&Type::of::<i64>(), "server.missing").is_none());
        assert!(source.value(&Type::of::<u8>(), "server.port").is_none());
    }
}
