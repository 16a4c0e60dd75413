//! Component Registry
//!
//! Maps type names used in patch descriptions to constructors. The built-in
//! units are registered by [`ComponentRegistry::new`]; embedders may add their
//! own with [`ComponentRegistry::register`].

use crate::component::{Arguments, Component, ComponentError};
use crate::components::{FloatParam, FloatToSample, SinGenerator};
use crate::port::ComponentDescription;
use std::collections::BTreeMap;
use thiserror::Error;

/// Constructor of a registered unit type
pub type ComponentFactory =
    Box<dyn Fn(Arguments) -> Result<Box<dyn Component>, ComponentError> + Send + Sync>;

/// Metadata about a registered unit type
#[derive(Debug, Clone)]
pub struct ComponentMetadata {
    pub type_name: String,
    pub description: String,
    /// Ports of an instance built without arguments; `None` when such an
    /// instance cannot be built
    pub ports: Option<ComponentDescription>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown component type '{0}'")]
    UnknownComponent(String),

    #[error("cannot construct {type_name}: {source}")]
    Construction {
        type_name: String,
        #[source]
        source: ComponentError,
    },
}

/// Registry of available unit types
pub struct ComponentRegistry {
    factories: BTreeMap<String, ComponentFactory>,
    metadata: BTreeMap<String, ComponentMetadata>,
}

impl ComponentRegistry {
    /// Registry holding the built-in units
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin();
        registry
    }

    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn register_builtin(&mut self) {
        self.register(
            FloatParam::TYPE_NAME,
            "Constant float source; argument value",
            |args| Ok(Box::new(FloatParam::from_arguments(args)?)),
        );

        self.register(
            SinGenerator::TYPE_NAME,
            "Sine oscillator with frequency, gain and offset inputs",
            |args| Ok(Box::new(SinGenerator::from_arguments(args)?)),
        );

        self.register(
            FloatToSample::TYPE_NAME,
            "Converts a float in [-1, 1] into a 16-bit stereo frame",
            |args| Ok(Box::new(FloatToSample::from_arguments(args)?)),
        );
    }

    /// Register a unit type, replacing any earlier one with the same name
    pub fn register<F>(&mut self, type_name: &str, description: &str, factory: F)
    where
        F: Fn(Arguments) -> Result<Box<dyn Component>, ComponentError> + Send + Sync + 'static,
    {
        let ports = factory(Arguments::new())
            .ok()
            .map(|instance| instance.description().clone());

        if self
            .factories
            .insert(type_name.to_string(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(type_name, "registry_replace");
        }

        self.metadata.insert(
            type_name.to_string(),
            ComponentMetadata {
                type_name: type_name.to_string(),
                description: description.to_string(),
                ports,
            },
        );
    }

    /// Construct a unit of the named type
    pub fn instantiate(
        &self,
        type_name: &str,
        args: Arguments,
    ) -> Result<Box<dyn Component>, RegistryError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownComponent(type_name.to_string()))?;
        factory(args).map_err(|source| RegistryError::Construction {
            type_name: type_name.to_string(),
            source,
        })
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names in sorted order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn metadata(&self, type_name: &str) -> Option<&ComponentMetadata> {
        self.metadata.get(type_name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ComponentMetadata> {
        self.metadata.values()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
