//! # smarthome-adapter-config-toml
//!
//! Capability file loader.
//!
//! ## Responsibilities
//! - Read the `[sensor]` and `[actuator]` capability tables and the
//!   `[general]` settings from a TOML document
//! - Implement [`CapabilitySource`] so the application can build its
//!   registries without knowing where the configuration lives
//!
//! A missing, unreadable or malformed file never stops the application: the
//! affected sections are logged and left empty.
//!
//! ```toml
//! [general]
//! grid_meter_device_id = "Grid Power Meter"
//! grid_meter_cadence_minutes = 15
//! tolerance_seconds = 300
//!
//! [sensor]
//! functionalities = ["TemperatureCelsius"]
//! [sensor.implementations]
//! TemperatureCelsius = "TemperatureCelsiusSensor"
//! [sensor.units]
//! TemperatureCelsius = "C"
//! [sensor.service_methods]
//! TemperatureCelsius = "list_instant_values"
//! ```
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for the port trait) and `smarthome-domain`
//! (for [`CapabilityTable`]).

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use smarthome_app::ports::capabilities::{
    DEFAULT_GRID_METER_CADENCE_MINUTES, DEFAULT_TOLERANCE_SECONDS,
};
use smarthome_app::ports::{CapabilitySource, GeneralSettings};
use smarthome_domain::registry::CapabilityTable;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GeneralSection {
    grid_meter_device_id: Option<String>,
    grid_meter_cadence_minutes: u32,
    tolerance_seconds: u32,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            grid_meter_device_id: None,
            grid_meter_cadence_minutes: DEFAULT_GRID_METER_CADENCE_MINUTES,
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
        }
    }
}

impl From<GeneralSection> for GeneralSettings {
    fn from(section: GeneralSection) -> Self {
        Self {
            grid_meter_device_id: section.grid_meter_device_id,
            grid_meter_cadence_minutes: section.grid_meter_cadence_minutes,
            tolerance_seconds: section.tolerance_seconds,
        }
    }
}

/// Capability configuration read from a TOML document.
#[derive(Debug, Clone, Default)]
pub struct TomlCapabilitySource {
    sensors: CapabilityTable,
    actuators: CapabilityTable,
    settings: GeneralSettings,
}

impl TomlCapabilitySource {
    /// Read the capability file at `path`.
    ///
    /// Failing to read the file yields an empty source.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loading capability file");
                Self::from_str(&content)
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "capability file unavailable, no functionality configured"
                );
                Self::default()
            }
        }
    }

    /// Parse a capability document.
    ///
    /// Each section, and each map of a capability section, is read on its
    /// own, so one malformed entry leaves the rest usable.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        let document: toml::Table = match content.parse() {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(error = %err, "malformed capability file, no functionality configured");
                return Self::default();
            }
        };

        Self {
            sensors: capability_table(&document, "sensor"),
            actuators: capability_table(&document, "actuator"),
            settings: section::<GeneralSection>(&document, "general").into(),
        }
    }
}

fn capability_table(document: &toml::Table, family: &str) -> CapabilityTable {
    let table = match document.get(family) {
        Some(toml::Value::Table(table)) => table,
        Some(_) => {
            tracing::warn!(section = family, "capability section is not a table, ignoring it");
            return CapabilityTable::default();
        }
        None => {
            tracing::debug!(section = family, "capability section missing");
            return CapabilityTable::default();
        }
    };
    CapabilityTable {
        functionalities: entry(table, family, "functionalities"),
        implementations: entry(table, family, "implementations"),
        units: entry(table, family, "units"),
        service_methods: entry(table, family, "service_methods"),
    }
}

fn entry<T>(table: &toml::Table, family: &str, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(value) = table.get(key) else {
        return T::default();
    };
    value.clone().try_into().unwrap_or_else(|err| {
        tracing::warn!(section = family, key, error = %err, "ignoring malformed capability entry");
        T::default()
    })
}

fn section<T>(document: &toml::Table, name: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(value) = document.get(name) else {
        tracing::debug!(section = name, "capability section missing");
        return T::default();
    };
    value.clone().try_into().unwrap_or_else(|err| {
        tracing::warn!(section = name, error = %err, "ignoring malformed capability section");
        T::default()
    })
}

impl CapabilitySource for TomlCapabilitySource {
    fn sensor_table(&self) -> CapabilityTable {
        self.sensors.clone()
    }

    fn actuator_table(&self) -> CapabilityTable {
        self.actuators.clone()
    }

    fn general_settings(&self) -> GeneralSettings {
        self.settings.clone()
    }
}
