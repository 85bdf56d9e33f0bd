//! Sensors — device capabilities that produce readings.
//!
//! Concrete sensor kinds are only known to the [`builtin_factory`]; the rest of
//! the system handles them as [`SensorRef`] trait objects.

use std::fmt;
use std::sync::Arc;

use crate::aggregate::AggregateRoot;
use crate::factory::DynamicFactory;
use crate::id::{DeviceId, SensorFunctionalityId, SensorId};

/// Canonical construction parameters of a sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorBlueprint {
    pub id: SensorId,
    pub functionality_id: SensorFunctionalityId,
    pub device_id: DeviceId,
}

/// State shared by every sensor kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorCore {
    id: SensorId,
    functionality_id: SensorFunctionalityId,
    device_id: DeviceId,
}

impl From<SensorBlueprint> for SensorCore {
    fn from(blueprint: SensorBlueprint) -> Self {
        Self {
            id: blueprint.id,
            functionality_id: blueprint.functionality_id,
            device_id: blueprint.device_id,
        }
    }
}

/// A sensor attached to a device.
pub trait Sensor: fmt::Debug + Send + Sync {
    fn core(&self) -> &SensorCore;

    /// Implementation name this sensor was built from.
    fn kind(&self) -> &'static str;

    fn id(&self) -> &SensorId {
        &self.core().id
    }

    fn functionality_id(&self) -> &SensorFunctionalityId {
        &self.core().functionality_id
    }

    fn device_id(&self) -> &DeviceId {
        &self.core().device_id
    }
}

/// Shared handle to a sensor of any kind.
pub type SensorRef = Arc<dyn Sensor>;

/// Factory producing [`SensorRef`]s from [`SensorBlueprint`]s.
pub type SensorFactory = DynamicFactory<SensorBlueprint, dyn Sensor>;

impl AggregateRoot for SensorRef {
    type Id = SensorId;

    const KIND: &'static str = "Sensor";

    fn identity(&self) -> &SensorId {
        self.id()
    }
}

macro_rules! sensor_kinds {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone)]
            pub struct $name {
                core: SensorCore,
            }

            impl $name {
                #[must_use]
                pub fn new(blueprint: SensorBlueprint) -> Self {
                    Self {
                        core: blueprint.into(),
                    }
                }
            }

            impl Sensor for $name {
                fn core(&self) -> &SensorCore {
                    &self.core
                }

                fn kind(&self) -> &'static str {
                    stringify!($name)
                }
            }
        )+

        /// Factory knowing every sensor kind shipped with the crate.
        #[must_use]
        pub fn builtin_factory() -> SensorFactory {
            let mut factory = SensorFactory::new();
            $(
                factory.register(stringify!($name), |blueprint| {
                    Ok(Arc::new($name::new(blueprint)) as SensorRef)
                });
            )+
            factory
        }
    };
}

sensor_kinds!(
    /// Ambient temperature in degrees Celsius.
    TemperatureCelsiusSensor,
    /// Relative humidity as a percentage.
    HumidityPercentageSensor,
    /// Open/closed, on/off style status.
    BinaryStatusSensor,
    /// Average power over the meter cadence.
    PowerAverageSensor,
    /// Position on a 0-100 scale.
    ScaleSensor,
    SunriseSensor,
    SunsetSensor,
    /// Wind speed and direction, reported as a two-part reading.
    WindSpeedAndDirectionSensor,
    /// Energy consumed over a period.
    ElectricEnergyConsumptionSensor,
    /// Instantaneous power drawn by a power source.
    SpecificTimePowerConsumptionSensor,
);
