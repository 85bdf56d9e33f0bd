//! Capability registry — what each configured functionality resolves to.
//!
//! A registry is built once from a [`CapabilityTable`] (the raw output of a
//! capability loader) and never changes afterwards. For every functionality it
//! records up to three facts, each of which may be absent independently:
//!
//! - the implementation name the [factory](crate::factory) should instantiate;
//! - the display unit of its readings;
//! - the service method that materialises its readings.
//!
//! Lookups of unknown functionalities return `None`; they are never errors.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{ActuatorFunctionalityId, SensorFunctionalityId};

/// Raw, unvalidated capability configuration for one family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityTable {
    /// Every functionality the configuration declares.
    pub functionalities: Vec<String>,
    /// Functionality → implementation name.
    pub implementations: HashMap<String, String>,
    /// Functionality → display unit.
    pub units: HashMap<String, String>,
    /// Functionality → service method name.
    pub service_methods: HashMap<String, String>,
}

impl CapabilityTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functionalities.is_empty()
            && self.implementations.is_empty()
            && self.units.is_empty()
            && self.service_methods.is_empty()
    }
}

/// What is known about a single functionality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryEntry {
    pub implementation: Option<String>,
    pub unit: Option<String>,
    pub service_method: Option<String>,
}

/// Immutable functionality → [`RegistryEntry`] mapping for one capability family.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry<Id> {
    listed: BTreeSet<Id>,
    entries: HashMap<Id, RegistryEntry>,
    skipped: Vec<String>,
}

/// Registry of sensor functionalities.
pub type SensorRegistry = CapabilityRegistry<SensorFunctionalityId>;

/// Registry of actuator functionalities.
pub type ActuatorRegistry = CapabilityRegistry<ActuatorFunctionalityId>;

impl<Id> Default for CapabilityRegistry<Id> {
    fn default() -> Self {
        Self {
            listed: BTreeSet::new(),
            entries: HashMap::new(),
            skipped: Vec::new(),
        }
    }
}

impl<Id> CapabilityRegistry<Id>
where
    Id: Clone + Eq + Hash + Ord,
{
    /// Registry that knows no functionality.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the registry, turning raw names into identifiers with `build_id`.
    ///
    /// Names that `build_id` rejects are left out and reported by
    /// [`skipped_identifiers`](Self::skipped_identifiers).
    pub fn from_table<F>(table: CapabilityTable, build_id: F) -> Self
    where
        F: Fn(&str) -> Result<Id, ValidationError>,
    {
        let mut registry = Self::default();

        for raw in &table.functionalities {
            match build_id(raw) {
                Ok(id) => {
                    registry.listed.insert(id.clone());
                    registry.entries.entry(id).or_default();
                }
                Err(_) => registry.skipped.push(raw.clone()),
            }
        }

        let CapabilityTable {
            implementations,
            units,
            service_methods,
            ..
        } = table;
        registry.merge(implementations, &build_id, |entry, value| {
            entry.implementation = Some(value);
        });
        registry.merge(units, &build_id, |entry, value| entry.unit = Some(value));
        registry.merge(service_methods, &build_id, |entry, value| {
            entry.service_method = Some(value);
        });

        registry
    }

    fn merge<F>(
        &mut self,
        values: HashMap<String, String>,
        build_id: &F,
        apply: impl Fn(&mut RegistryEntry, String),
    ) where
        F: Fn(&str) -> Result<Id, ValidationError>,
    {
        for (raw, value) in values {
            match build_id(&raw) {
                Ok(id) => apply(self.entries.entry(id).or_default(), value),
                Err(_) => {
                    if !self.skipped.contains(&raw) {
                        self.skipped.push(raw);
                    }
                }
            }
        }
    }

    /// Every functionality declared by the configuration, sorted.
    #[must_use]
    pub fn all_functionalities(&self) -> BTreeSet<Id> {
        self.listed.clone()
    }

    /// Whether the configuration declares this functionality.
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        self.listed.contains(id)
    }

    #[must_use]
    pub fn entry(&self, id: &Id) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn implementation_name_for(&self, id: &Id) -> Option<&str> {
        self.entry(id)?.implementation.as_deref()
    }

    #[must_use]
    pub fn unit_for(&self, id: &Id) -> Option<&str> {
        self.entry(id)?.unit.as_deref()
    }

    #[must_use]
    pub fn service_method_for(&self, id: &Id) -> Option<&str> {
        self.entry(id)?.service_method.as_deref()
    }

    /// Raw names that were not valid identifiers.
    #[must_use]
    pub fn skipped_identifiers(&self) -> &[String] {
        &self.skipped
    }
}

impl SensorRegistry {
    /// Build a sensor registry from its raw table.
    #[must_use]
    pub fn sensors(table: CapabilityTable) -> Self {
        Self::from_table(table, SensorFunctionalityId::from_str)
    }
}

impl ActuatorRegistry {
    /// Build an actuator registry from its raw table.
    #[must_use]
    pub fn actuators(table: CapabilityTable) -> Self {
        Self::from_table(table, ActuatorFunctionalityId::from_str)
    }
}
