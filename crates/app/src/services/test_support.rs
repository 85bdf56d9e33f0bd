//! In-memory repository used by the service tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

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
use smarthome_domain::value::{InstantSeriesValue, TimeSeriesValue};

use crate::ports::{
    ActuatorRepository, DeviceRepository, HouseRepository, InstantValueRepository, Repository,
    Reserved, RoomRepository, SensorRepository, ValueRepository,
};

type Rows<T> = HashMap<<T as AggregateRoot>::Id, (T, u64)>;

pub(crate) struct InMemory<T: AggregateRoot> {
    store: Arc<Mutex<Rows<T>>>,
}

impl<T: AggregateRoot> Default for InMemory<T> {
    fn default() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: AggregateRoot> Clone for InMemory<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: AggregateRoot + Clone> InMemory<T> {
    fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let store = self.store.lock().unwrap();
        store
            .values()
            .filter(|(entity, _)| predicate(entity))
            .map(|(entity, _)| entity.clone())
            .collect()
    }
}

impl<T> Repository<T> for InMemory<T>
where
    T: AggregateRoot + Clone + Send + Sync + 'static,
{
    fn save(&self, entity: T) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut store = self.store.lock().unwrap();
        let result = if store.contains_key(entity.identity()) {
            None
        } else {
            store.insert(entity.identity().clone(), (entity.clone(), 0));
            Some(entity)
        };
        async { Ok(result) }
    }

    fn update(&self, entity: T) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut store = self.store.lock().unwrap();
        let result = store.get_mut(entity.identity()).map(|row| {
            *row = (entity.clone(), row.1 + 1);
            entity
        });
        async { Ok(result) }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<T>,
        entity: T,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut store = self.store.lock().unwrap();
        let result = if reservation.matches(&entity) {
            match store.get_mut(entity.identity()) {
                Some(row) if row.1 == reservation.version() => {
                    *row = (entity.clone(), row.1 + 1);
                    Some(entity)
                }
                _ => None,
            }
        } else {
            None
        };
        async { Ok(result) }
    }

    fn find_by_id(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store.get(id).map(|(entity, _)| entity.clone());
        async { Ok(result) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<Reserved<T>>, SmartHomeError>> + Send {
        let store = self.store.lock().unwrap();
        let result = store
            .get(id)
            .map(|(entity, version)| Reserved::new(entity.clone(), *version));
        async { Ok(result) }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, SmartHomeError>> + Send {
        let result = self.select(|_| true);
        async { Ok(result) }
    }

    fn contains_by_id(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let result = self.store.lock().unwrap().contains_key(id);
        async move { Ok(result) }
    }
}

impl HouseRepository for InMemory<House> {}

impl RoomRepository for InMemory<Room> {
    fn find_by_house_id(
        &self,
        house_id: &HouseId,
    ) -> impl Future<Output = Result<Vec<Room>, SmartHomeError>> + Send {
        let result = self.select(|room| &room.house_id == house_id);
        async { Ok(result) }
    }
}

impl DeviceRepository for InMemory<Device> {
    fn find_by_room_id(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let result = self.select(|device| &device.room_id == room_id);
        async { Ok(result) }
    }
}

impl SensorRepository for InMemory<SensorRef> {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        let result = self.select(|sensor| sensor.device_id() == device_id);
        async { Ok(result) }
    }

    fn find_by_functionality_id(
        &self,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        let result = self.select(|sensor| sensor.functionality_id() == functionality_id);
        async { Ok(result) }
    }

    fn find_by_device_id_and_functionality_id(
        &self,
        device_id: &DeviceId,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        let result = self.select(|sensor| {
            sensor.device_id() == device_id && sensor.functionality_id() == functionality_id
        });
        async { Ok(result) }
    }
}

impl ActuatorRepository for InMemory<ActuatorRef> {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send {
        let result = self.select(|actuator| actuator.device_id() == device_id);
        async { Ok(result) }
    }

    fn find_by_functionality_id(
        &self,
        functionality_id: &ActuatorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send {
        let result = self.select(|actuator| actuator.functionality_id() == functionality_id);
        async { Ok(result) }
    }
}

impl<V: TimeSeriesValue> ValueRepository<V> for InMemory<V> {
    fn find_by_sensor_id(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send {
        let result = self.select(|value| value.sensor_id() == sensor_id);
        async { Ok(result) }
    }

    fn find_by_sensor_id_between(
        &self,
        sensor_id: &SensorId,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send {
        let result =
            self.select(|value| value.sensor_id() == sensor_id && value.falls_within(start, end));
        async { Ok(result) }
    }
}

impl<V: InstantSeriesValue> InstantValueRepository<V> for InMemory<V> {
    fn find_last_value_recorded(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let result = self
            .select(|value| value.sensor_id() == sensor_id)
            .into_iter()
            .max_by_key(InstantSeriesValue::recorded_at);
        async { Ok(result) }
    }
}
