//! Storage port — repository traits for persistence.
//!
//! Every aggregate is stored through the same [`Repository`] contract. Besides
//! plain CRUD it offers *reservation*: [`Repository::find_by_id_and_reserve`]
//! hands out a [`Reserved`] handle that remembers the stored version of the
//! aggregate, and [`Repository::update_reserved`] writes the new state back
//! without a second lookup. The write is refused (`None`, nothing written) when
//! the new state belongs to another aggregate, or when someone else wrote the
//! aggregate since the handle was taken.
//!
//! `Err` is reserved for infrastructure failures. Protocol misses (unknown id,
//! duplicate save, rejected reservation) are `None` or `false`.

use std::future::Future;

use smarthome_domain::actuator::ActuatorRef;
use smarthome_domain::aggregate::AggregateRoot;
use smarthome_domain::device::Device;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::house::House;
use smarthome_domain::id::{
    ActuatorFunctionalityId, DeviceId, HouseId, RoomId, SensorFunctionalityId, SensorId,
};
use smarthome_domain::room::Room;
use smarthome_domain::sensor::SensorRef;
use smarthome_domain::time::Timestamp;
use smarthome_domain::value::{
    InstantLocationValue, InstantSeriesValue, InstantValue, PeriodValue, TimeSeriesValue,
};

/// Caller-held reservation of an aggregate, taken at a given stored version.
///
/// Only obtainable from [`Repository::find_by_id_and_reserve`] and consumed by
/// [`Repository::update_reserved`].
#[derive(Debug)]
pub struct Reserved<T> {
    entity: T,
    version: u64,
}

impl<T> Reserved<T> {
    /// Wrap `entity` as read at `version`. Used by repository implementations.
    #[must_use]
    pub fn new(entity: T, version: u64) -> Self {
        Self { entity, version }
    }

    /// The aggregate as it was when reserved.
    #[must_use]
    pub fn entity(&self) -> &T {
        &self.entity
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn into_entity(self) -> T {
        self.entity
    }
}

impl<T: AggregateRoot> Reserved<T> {
    /// Whether `candidate` is the aggregate this reservation was taken for.
    #[must_use]
    pub fn matches(&self, candidate: &T) -> bool {
        self.entity.is_same_as(candidate)
    }
}

/// Persistence contract shared by every aggregate.
pub trait Repository<T: AggregateRoot + Send + Sync + 'static>: Send + Sync {
    /// Store a new aggregate. `None` when the identity is already taken.
    fn save(&self, entity: T) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send;

    /// Overwrite a stored aggregate. `None` when the identity is unknown.
    fn update(&self, entity: T)
    -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send;

    /// Overwrite the reserved aggregate with `entity`.
    ///
    /// `None`, and nothing written, when `entity` is not the reserved aggregate
    /// or the stored version moved on since the reservation.
    fn update_reserved(
        &self,
        reservation: Reserved<T>,
        entity: T,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send;

    fn find_by_id(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send;

    /// Read an aggregate and reserve it for a following [`update_reserved`](Self::update_reserved).
    fn find_by_id_and_reserve(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<Reserved<T>>, SmartHomeError>> + Send;

    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, SmartHomeError>> + Send;

    fn contains_by_id(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send;
}

/// Repository for [`House`]s.
pub trait HouseRepository: Repository<House> {}

/// Repository for [`Room`]s.
pub trait RoomRepository: Repository<Room> {
    fn find_by_house_id(
        &self,
        house_id: &HouseId,
    ) -> impl Future<Output = Result<Vec<Room>, SmartHomeError>> + Send;
}

/// Repository for [`Device`]s.
pub trait DeviceRepository: Repository<Device> {
    fn find_by_room_id(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send;
}

/// Repository for sensors of any kind.
pub trait SensorRepository: Repository<SensorRef> {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send;

    fn find_by_functionality_id(
        &self,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send;

    fn find_by_device_id_and_functionality_id(
        &self,
        device_id: &DeviceId,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send;
}

/// Repository for actuators of any kind.
pub trait ActuatorRepository: Repository<ActuatorRef> {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send;

    fn find_by_functionality_id(
        &self,
        functionality_id: &ActuatorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send;
}

/// Repository for one shape of recorded value.
pub trait ValueRepository<V: TimeSeriesValue>: Repository<V> {
    /// Every value recorded by `sensor_id`, in no particular order.
    fn find_by_sensor_id(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send;

    /// Values of `sensor_id` inside the window, using
    /// [`TimeSeriesValue::falls_within`] semantics.
    fn find_by_sensor_id_between(
        &self,
        sensor_id: &SensorId,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send;
}

/// Repository for values recorded at a single instant.
pub trait InstantValueRepository<V: InstantSeriesValue>: ValueRepository<V> {
    /// The value of `sensor_id` with the latest timestamp.
    fn find_last_value_recorded(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send;
}

/// A storage backend: hands out repository handles sharing one store.
pub trait Storage: Send + Sync {
    type Houses: HouseRepository + Clone + 'static;
    type Rooms: RoomRepository + Clone + 'static;
    type Devices: DeviceRepository + Clone + 'static;
    type Sensors: SensorRepository + Clone + 'static;
    type Actuators: ActuatorRepository + Clone + 'static;
    type InstantValues: InstantValueRepository<InstantValue> + Clone + 'static;
    type InstantLocationValues: InstantValueRepository<InstantLocationValue> + Clone + 'static;
    type PeriodValues: ValueRepository<PeriodValue> + Clone + 'static;

    fn houses(&self) -> Self::Houses;
    fn rooms(&self) -> Self::Rooms;
    fn devices(&self) -> Self::Devices;
    fn sensors(&self) -> Self::Sensors;
    fn actuators(&self) -> Self::Actuators;
    fn instant_values(&self) -> Self::InstantValues;
    fn instant_location_values(&self) -> Self::InstantLocationValues;
    fn period_values(&self) -> Self::PeriodValues;
}
