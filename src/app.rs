//! Application object: client, configuration and registered element types

use std::sync::Arc;

use crate::client::{EmbeddedClient, GraphClient};
use crate::config::OgmConfig;
use crate::logging;
use crate::provider::Provider;
use crate::schema::{ElementSchema, Registry};
use crate::session::Session;

/// Factory for sessions sharing one client and one registry
pub struct Ogm {
    config: OgmConfig,
    client: Arc<dyn GraphClient>,
    provider: Arc<dyn Provider>,
    registry: Arc<Registry>,
}

impl Ogm {
    pub fn new(client: Arc<dyn GraphClient>, config: OgmConfig) -> Self {
        let provider = config.provider.provider();
        Self {
            config,
            client,
            provider,
            registry: Arc::new(Registry::new()),
        }
    }

    /// Backed by a fresh in-process graph
    pub fn embedded() -> Self {
        Self::new(Arc::new(EmbeddedClient::new()), OgmConfig::default())
    }

    /// Replace the provider chosen by the configuration
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = provider;
        self
    }

    /// Install the tracing subscriber at the configured log level
    pub fn init_logging(&self) -> bool {
        logging::init_tracing(&self.config.log_level)
    }

    pub fn config(&self) -> &OgmConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register element types so results with their labels deserialize into
    /// them. Sessions created earlier keep the registry they started with.
    pub fn register<I>(&mut self, schemas: I)
    where
        I: IntoIterator<Item = Arc<ElementSchema>>,
    {
        let registry = Arc::make_mut(&mut self.registry);
        for schema in schemas {
            registry.register(schema);
        }
    }

    pub fn session(&self) -> Session {
        Session::new(
            self.client.clone(),
            self.registry.clone(),
            self.provider.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use crate::schema::{DataType, Property};

    #[test]
    fn test_register_and_lookup() {
        let mut app = Ogm::embedded();
        let person = ElementSchema::vertex("Person")
            .property("name", Property::new(DataType::String))
            .build()
            .unwrap();
        app.register([person.clone()]);

        assert!(Arc::ptr_eq(&app.registry().vertex("person"), &person));
        assert_eq!(app.registry().vertex("robot").label(), "generic_vertex");
    }

    #[test]
    fn test_init_logging_once() {
        let app = Ogm::embedded();
        app.init_logging();
        assert!(!app.init_logging());
    }

    #[test]
    fn test_connection_settings_stay_on_config() {
        let config = OgmConfig::from_yaml_str(
            "aliases:\n  g: social_g\nresponse_timeout_ms: 1500\n",
        )
        .unwrap();
        let app = Ogm::new(Arc::new(EmbeddedClient::new()), config);
        assert_eq!(app.config().aliases["g"], "social_g");
        assert_eq!(
            app.config().response_timeout(),
            std::time::Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_provider_follows_config() {
        let config = OgmConfig {
            provider: ProviderKind::JanusGraph,
            ..OgmConfig::default()
        };
        let app = Ogm::new(Arc::new(EmbeddedClient::new()), config);
        assert_eq!(app.provider().name(), "janusgraph");
    }
}
