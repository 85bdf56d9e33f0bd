//! # smarthome-adapter-storage-memory
//!
//! In-memory persistence adapter.
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `smarthome-app::ports::storage`
//! - Keep a version per stored aggregate so reservations can detect
//!   concurrent writes
//! - Store sensors and actuators as the trait objects the factory produced
//!
//! Nothing survives the process; use the `SQLite` adapter for that.
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for port traits) and `smarthome-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

mod repository;

use smarthome_app::ports::Storage;
use smarthome_domain::actuator::ActuatorRef;
use smarthome_domain::device::Device;
use smarthome_domain::house::House;
use smarthome_domain::room::Room;
use smarthome_domain::sensor::SensorRef;
use smarthome_domain::value::{InstantLocationValue, InstantValue, PeriodValue};

pub use repository::MemoryRepository;

/// One in-memory table per aggregate type.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    houses: MemoryRepository<House>,
    rooms: MemoryRepository<Room>,
    devices: MemoryRepository<Device>,
    sensors: MemoryRepository<SensorRef>,
    actuators: MemoryRepository<ActuatorRef>,
    instant_values: MemoryRepository<InstantValue>,
    instant_location_values: MemoryRepository<InstantLocationValue>,
    period_values: MemoryRepository<PeriodValue>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    type Houses = MemoryRepository<House>;
    type Rooms = MemoryRepository<Room>;
    type Devices = MemoryRepository<Device>;
    type Sensors = MemoryRepository<SensorRef>;
    type Actuators = MemoryRepository<ActuatorRef>;
    type InstantValues = MemoryRepository<InstantValue>;
    type InstantLocationValues = MemoryRepository<InstantLocationValue>;
    type PeriodValues = MemoryRepository<PeriodValue>;

    fn houses(&self) -> Self::Houses {
        self.houses.clone()
    }

    fn rooms(&self) -> Self::Rooms {
        self.rooms.clone()
    }

    fn devices(&self) -> Self::Devices {
        self.devices.clone()
    }

    fn sensors(&self) -> Self::Sensors {
        self.sensors.clone()
    }

    fn actuators(&self) -> Self::Actuators {
        self.actuators.clone()
    }

    fn instant_values(&self) -> Self::InstantValues {
        self.instant_values.clone()
    }

    fn instant_location_values(&self) -> Self::InstantLocationValues {
        self.instant_location_values.clone()
    }

    fn period_values(&self) -> Self::PeriodValues {
        self.period_values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smarthome_app::ports::{Repository, SensorRepository};
    use smarthome_domain::id::{DeviceId, HouseId, SensorFunctionalityId, SensorId};
    use smarthome_domain::sensor::{self, SensorBlueprint};

    #[tokio::test]
    async fn should_share_tables_between_handles() {
        let storage = MemoryStorage::new();
        let house = House::builder()
            .id(HouseId::new("House001").unwrap())
            .build()
            .unwrap();
        storage.houses().save(house).await.unwrap();

        let found = storage
            .houses()
            .contains_by_id(&HouseId::new("House001").unwrap())
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test]
    async fn should_keep_sensor_kind_when_stored() {
        let storage = MemoryStorage::new();
        let sensor = sensor::builtin_factory()
            .create(
                Some("SunriseSensor"),
                SensorBlueprint {
                    id: SensorId::new("Sensor001").unwrap(),
                    functionality_id: SensorFunctionalityId::new("Sunrise").unwrap(),
                    device_id: DeviceId::new("Device001").unwrap(),
                },
            )
            .unwrap();
        storage.sensors().save(sensor).await.unwrap();

        let listed = storage
            .sensors()
            .find_by_device_id(&DeviceId::new("Device001").unwrap())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind(), "SunriseSensor");
    }
}
