//! Startup assembly of registries and factories.
//!
//! Registries are built completely from the [`CapabilitySource`] before any
//! factory call can happen, then shared read-only behind `Arc`s.

use std::sync::Arc;

use smarthome_domain::actuator::{self, ActuatorFactory};
use smarthome_domain::error::{CapabilityError, SmartHomeError};
use smarthome_domain::factory::FactoryError;
use smarthome_domain::registry::{ActuatorRegistry, SensorRegistry};
use smarthome_domain::sensor::{self, SensorFactory};

use crate::ports::{CapabilitySource, GeneralSettings};

/// Everything needed to turn functionality names into sensors and actuators.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub sensors: Arc<SensorRegistry>,
    pub actuators: Arc<ActuatorRegistry>,
    pub sensor_factory: Arc<SensorFactory>,
    pub actuator_factory: Arc<ActuatorFactory>,
    pub settings: GeneralSettings,
}

impl Capabilities {
    /// Build registries from `source` and pair them with the built-in factories.
    #[tracing::instrument(skip(source))]
    pub fn load(source: &impl CapabilitySource) -> Self {
        Self::with_factories(source, sensor::builtin_factory(), actuator::builtin_factory())
    }

    /// Same as [`load`](Self::load) with caller-provided factories, for
    /// deployments that register extra kinds.
    pub fn with_factories(
        source: &impl CapabilitySource,
        sensor_factory: SensorFactory,
        actuator_factory: ActuatorFactory,
    ) -> Self {
        let sensors = SensorRegistry::sensors(source.sensor_table());
        let actuators = ActuatorRegistry::actuators(source.actuator_table());

        for raw in sensors.skipped_identifiers() {
            tracing::warn!(functionality = %raw, "skipping invalid sensor functionality");
        }
        for raw in actuators.skipped_identifiers() {
            tracing::warn!(functionality = %raw, "skipping invalid actuator functionality");
        }
        warn_unresolvable(
            "sensor",
            sensors
                .all_functionalities()
                .iter()
                .map(|id| (id.to_string(), sensors.implementation_name_for(id))),
            |name| sensor_factory.supports(name),
        );
        warn_unresolvable(
            "actuator",
            actuators
                .all_functionalities()
                .iter()
                .map(|id| (id.to_string(), actuators.implementation_name_for(id))),
            |name| actuator_factory.supports(name),
        );

        tracing::info!(
            sensor_functionalities = sensors.all_functionalities().len(),
            actuator_functionalities = actuators.all_functionalities().len(),
            "capabilities loaded"
        );

        Self {
            sensors: Arc::new(sensors),
            actuators: Arc::new(actuators),
            sensor_factory: Arc::new(sensor_factory),
            actuator_factory: Arc::new(actuator_factory),
            settings: source.general_settings(),
        }
    }
}

/// Map a factory failure for `functionality` onto the service error type.
pub(crate) fn construction_error(functionality: &str, err: FactoryError) -> SmartHomeError {
    match err {
        FactoryError::Rejected(validation) => validation.into(),
        FactoryError::MissingImplementation | FactoryError::UnknownImplementation(_) => {
            tracing::warn!(%functionality, error = %err, "cannot instantiate functionality");
            CapabilityError::NotConstructible {
                functionality: functionality.to_string(),
            }
            .into()
        }
    }
}

fn warn_unresolvable<'a>(
    family: &str,
    entries: impl Iterator<Item = (String, Option<&'a str>)>,
    supports: impl Fn(&str) -> bool,
) {
    for (functionality, implementation) in entries {
        match implementation {
            None => tracing::warn!(family, %functionality, "functionality has no implementation"),
            Some(name) if !supports(name) => tracing::warn!(
                family,
                %functionality,
                implementation = name,
                "implementation is not registered in the factory"
            ),
            Some(_) => {}
        }
    }
}
