//! Creating ready to use injectors.

use crate::config::{BootstrapConfig, ConfigSource};
use bindery_di::bindings::Binding;
use bindery_di::declaration::{DeclarationType, Source};
use bindery_di::injector::{Injector, InjectorBuilder};
use bindery_di::instance::Instance;
use bindery_di::macros::Declared;
use bindery_di::resource::Resource;
use bindery_di::scope::APPLICATION;
use bindery_di::supplier::ConfigurationPtr;
use bindery_di::types::Type;
use bindery_di::{ConfigurationError, InjectionError};
use config::{Config, ConfigError};
use derive_more::Constructor;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error building injector: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Error initializing instances: {0}")]
    Injection(#[from] InjectionError),
}

const SOURCE_IDENT: &str = "bindery::bootstrap";

/// Entrypoint creating injectors configured from the environment. Binds a [ConfigSource] as the
/// default configuration, which makes configuration lookup declarations resolvable.
#[derive(Constructor, Clone, Debug)]
pub struct Bootstrap {
    config: BootstrapConfig,
    sources: Config,
}

impl Bootstrap {
    /// Reads the configuration from `bindery.json` and `BINDERY_*` environment variables.
    pub fn from_environment() -> Result<Self, BootstrapError> {
        let sources = BootstrapConfig::load_sources()?;
        let config = BootstrapConfig::from_sources(&sources)?;
        Ok(Self::new(config, sources))
    }

    #[inline]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Builds the injector with the given declarations.
    pub fn injector(&self, builder: InjectorBuilder) -> Result<Injector, BootstrapError> {
        if self.config.install_tracing_logger {
            // ignore already installed subscribers
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .try_init();
        }

        let configuration: ConfigurationPtr = Arc::new(ConfigSource::new(self.sources.clone()));
        let injector = builder
            .with_eager_supplier_substitution(self.config.eager_supplier_substitution)
            .with_binding(
                Binding::new(
                    Resource::everywhere(Instance::default_of(Type::configuration())),
                    APPLICATION,
                    Source::new(SOURCE_IDENT, 0, DeclarationType::Default),
                ),
                Declared::Constant(Arc::new(configuration)),
            )
            .build()?;

        if self.config.eager_singletons {
            info!("Initializing singletons...");
            injector.initialize_eagerly()?;
        }

        Ok(injector)
    }
}

#[cfg(test)]
mod tests {
    use crate::bootstrap::{Bootstrap, BootstrapError};
    use crate::config::BootstrapConfig;
    use bindery_di::bindings::Binding;
    use bindery_di::declaration::{DeclarationType, Source};
    use bindery_di::injector::InjectorBuilder;
    use bindery_di::instance::{Instance, Name};
    use bindery_di::macros::Declared;
    use bindery_di::resolver::TypedResolver;
    use bindery_di::resource::Resource;
    use bindery_di::scope::APPLICATION;
    use bindery_di::types::Type;
    use bindery_di::InjectionError;
    use config::Config;

    fn bootstrap(eager_singletons: bool) -> Bootstrap {
        let sources = Config::builder()
            .set_override("install_tracing_logger", false)
            .unwrap()
            .set_override("eager_singletons", eager_singletons)
            .unwrap()
            .set_override("greeting", "hello")
            .unwrap()
            .build()
            .unwrap();

        Bootstrap::new(BootstrapConfig::from_sources(&sources).unwrap(), sources)
    }

    fn configured(key: &'static str) -> InjectorBuilder {
        InjectorBuilder::new().with_binding(
            Binding::new(
                Resource::everywhere(Instance::new(Name::named(key), Type::of::<String>())),
                APPLICATION,
                Source::new("bootstrap_test", 0, DeclarationType::Explicit),
            ),
            Declared::Configure(key.to_string()),
        )
    }

    #[test]
    fn should_resolve_configured_values() {
        let injector = bootstrap(false).injector(configured("greeting")).unwrap();

        let greeting = injector
            .resolve_typed::<String>(Name::named("greeting"), Type::of::<String>())
            .unwrap();
        assert_eq!(*greeting, "hello");
    }

    #[test]
    fn should_fail_eager_initialization_on_missing_values() {
        assert!(bootstrap(false).injector(configured("missing")).is_ok());
        assert!(matches!(
            bootstrap(true).injector(configured("missing")),
            Err(BootstrapError::Injection(
                InjectionError::NoConfiguredValue { .. }
            ))
        ));
    }
}
