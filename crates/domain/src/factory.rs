//! Dynamic object factory — builds sensors and actuators from an implementation name.
//!
//! Each supported kind registers a constructor closure under its
//! implementation name. Callers look the name up in the
//! [registry](crate::registry) and hand it to the factory together with a
//! blueprint holding the canonical construction parameters. Adding a new kind
//! means registering one more closure; neither the factory nor its callers
//! change.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;

/// Constructor registered for one implementation name.
pub type Constructor<A, T> = Box<dyn Fn(A) -> Result<Arc<T>, ValidationError> + Send + Sync>;

/// Why the factory produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("no implementation name was given")]
    MissingImplementation,

    #[error("implementation `{0}` is not registered")]
    UnknownImplementation(String),

    #[error("implementation rejected its parameters")]
    Rejected(#[from] ValidationError),
}

/// Name → constructor table producing `Arc<T>` from blueprints of type `A`.
pub struct DynamicFactory<A, T: ?Sized> {
    constructors: HashMap<String, Constructor<A, T>>,
}

impl<A, T: ?Sized> Default for DynamicFactory<A, T> {
    fn default() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }
}

impl<A, T: ?Sized> fmt::Debug for DynamicFactory<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicFactory")
            .field("implementations", &self.implementations())
            .finish()
    }
}

impl<A, T: ?Sized> DynamicFactory<A, T> {
    /// Factory without any registered kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(A) -> Result<Arc<T>, ValidationError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    /// Registered implementation names, sorted.
    #[must_use]
    pub fn implementations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn supports(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build an instance, reporting why it failed.
    ///
    /// # Errors
    ///
    /// Returns a [`FactoryError`] when the name is missing or unknown, or when
    /// the constructor rejects the blueprint.
    pub fn try_create(
        &self,
        implementation: Option<&str>,
        blueprint: A,
    ) -> Result<Arc<T>, FactoryError> {
        let name = implementation.ok_or(FactoryError::MissingImplementation)?;
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| FactoryError::UnknownImplementation(name.to_string()))?;
        Ok(constructor(blueprint)?)
    }

    /// Build an instance, or `None` on any failure.
    #[must_use]
    pub fn create(&self, implementation: Option<&str>, blueprint: A) -> Option<Arc<T>> {
        self.try_create(implementation, blueprint).ok()
    }
}
