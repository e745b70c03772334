//! The immutable plugin registry.
//!
//! Built once at startup and passed to the run controller; there is no way
//! to add or replace a plugin afterwards.

use crate::plugin::{Plugin, PluginDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Errors from building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two plugins share an id.
    DuplicatePlugin { plugin_id: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePlugin { plugin_id } => {
                write!(f, "plugin '{plugin_id}' is registered twice")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Collects plugins before freezing them into a [`PluginRegistry`].
#[derive(Default)]
pub struct PluginRegistryBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Adds a shared plugin.
    #[must_use]
    pub fn with_shared(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if two plugins share an id.
    pub fn build(self) -> Result<PluginRegistry, RegistryError> {
        let mut index = HashMap::with_capacity(self.plugins.len());
        for (position, plugin) in self.plugins.iter().enumerate() {
            if index.insert(plugin.id().to_string(), position).is_some() {
                return Err(RegistryError::DuplicatePlugin {
                    plugin_id: plugin.id().to_string(),
                });
            }
        }
        Ok(PluginRegistry {
            plugins: self.plugins,
            index,
        })
    }
}

/// An immutable set of plugins, looked up by id.
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::new()
    }

    /// Returns the plugin with `plugin_id`.
    #[must_use]
    pub fn get(&self, plugin_id: &str) -> Option<&Arc<dyn Plugin>> {
        self.index.get(plugin_id).map(|&i| &self.plugins[i])
    }

    /// Returns true if a plugin with `plugin_id` is registered.
    #[must_use]
    pub fn contains(&self, plugin_id: &str) -> bool {
        self.index.contains_key(plugin_id)
    }

    /// Describes every plugin in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.plugins.iter().map(|p| p.descriptor()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.plugins.iter().map(|p| p.id()).collect();
        f.debug_struct("PluginRegistry").field("plugins", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSchema, PluginConfig};
    use crate::media::MediaFile;
    use crate::plugin::{PluginContext, PluginError, PluginOutput};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Plugin for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn config_schema(&self) -> ConfigSchema {
            ConfigSchema::Passthrough
        }

        async fn run(
            &self,
            inputs: Vec<MediaFile>,
            _config: &PluginConfig,
            _ctx: &PluginContext,
        ) -> Result<PluginOutput, PluginError> {
            Ok(PluginOutput::files(inputs))
        }
    }

    #[test]
    fn lookup_by_id() {
        let registry = PluginRegistry::builder()
            .with_plugin(Named("alpha"))
            .with_plugin(Named("beta"))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("beta").map(|p| p.id()), Some("beta"));
        assert!(registry.get("gamma").is_none());
        assert!(registry.contains("alpha"));
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let registry = PluginRegistry::builder()
            .with_plugin(Named("zeta"))
            .with_shared(Arc::new(Named("alpha")))
            .build()
            .unwrap();
        let ids: Vec<String> = registry.descriptors().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = PluginRegistry::builder()
            .with_plugin(Named("alpha"))
            .with_plugin(Named("alpha"))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicatePlugin {
                plugin_id: "alpha".to_string()
            }
        );
    }
}
