//! Versioned in-memory table implementing every repository port.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use smarthome_app::ports::{
    ActuatorRepository, DeviceRepository, HouseRepository, InstantValueRepository, Repository,
    Reserved, RoomRepository, SensorRepository, ValueRepository,
};
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

/// A stored aggregate and the number of times it has been rewritten.
#[derive(Debug, Clone)]
struct Versioned<T> {
    entity: T,
    version: u64,
}

type Rows<T> = HashMap<<T as AggregateRoot>::Id, Versioned<T>>;

/// In-memory repository for one aggregate type.
///
/// Clones share the same table.
pub struct MemoryRepository<T: AggregateRoot> {
    rows: Arc<Mutex<Rows<T>>>,
}

impl<T: AggregateRoot> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: AggregateRoot> Clone for MemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T: AggregateRoot + Clone> MemoryRepository<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a row half written, so a
    // poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, Rows<T>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.lock()
            .values()
            .filter(|row| predicate(&row.entity))
            .map(|row| row.entity.clone())
            .collect()
    }
}

impl<T> Repository<T> for MemoryRepository<T>
where
    T: AggregateRoot + Clone + Send + Sync + 'static,
{
    fn save(&self, entity: T) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut rows = self.lock();
        let result = if rows.contains_key(entity.identity()) {
            tracing::debug!(kind = T::KIND, id = %entity.identity(), "save refused, id taken");
            None
        } else {
            rows.insert(
                entity.identity().clone(),
                Versioned {
                    entity: entity.clone(),
                    version: 0,
                },
            );
            Some(entity)
        };
        async { Ok(result) }
    }

    fn update(&self, entity: T) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut rows = self.lock();
        let result = rows.get_mut(entity.identity()).map(|row| {
            row.entity = entity.clone();
            row.version += 1;
            entity
        });
        async { Ok(result) }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<T>,
        entity: T,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let mut rows = self.lock();
        let result = if reservation.matches(&entity) {
            match rows.get_mut(entity.identity()) {
                Some(row) if row.version == reservation.version() => {
                    row.entity = entity.clone();
                    row.version += 1;
                    Some(entity)
                }
                _ => {
                    tracing::debug!(kind = T::KIND, id = %entity.identity(), "stale reservation");
                    None
                }
            }
        } else {
            tracing::debug!(kind = T::KIND, id = %entity.identity(), "reservation for another aggregate");
            None
        };
        async { Ok(result) }
    }

    fn find_by_id(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<T>, SmartHomeError>> + Send {
        let result = self.lock().get(id).map(|row| row.entity.clone());
        async { Ok(result) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<Reserved<T>>, SmartHomeError>> + Send {
        let result = self
            .lock()
            .get(id)
            .map(|row| Reserved::new(row.entity.clone(), row.version));
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
        let result = self.lock().contains_key(id);
        async move { Ok(result) }
    }
}

impl HouseRepository for MemoryRepository<House> {}

impl RoomRepository for MemoryRepository<Room> {
    fn find_by_house_id(
        &self,
        house_id: &HouseId,
    ) -> impl Future<Output = Result<Vec<Room>, SmartHomeError>> + Send {
        let result = self.select(|room| &room.house_id == house_id);
        async { Ok(result) }
    }
}

impl DeviceRepository for MemoryRepository<Device> {
    fn find_by_room_id(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let result = self.select(|device| &device.room_id == room_id);
        async { Ok(result) }
    }
}

impl SensorRepository for MemoryRepository<SensorRef> {
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

impl ActuatorRepository for MemoryRepository<ActuatorRef> {
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

impl<V: TimeSeriesValue> ValueRepository<V> for MemoryRepository<V> {
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

impl<V: InstantSeriesValue> InstantValueRepository<V> for MemoryRepository<V> {
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

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use smarthome_domain::location::GpsCode;
    use smarthome_domain::reading::Reading;
    use smarthome_domain::room::RoomDimensions;
    use smarthome_domain::value::{InstantLocationValue, InstantValue, PeriodValue};

    fn room(id: &str, floor: i32) -> Room {
        Room::builder()
            .id(RoomId::new(id).unwrap())
            .house_id(HouseId::new("House001").unwrap())
            .floor(floor)
            .dimensions(RoomDimensions::new(4.0, 3.0, 2.5).unwrap())
            .build()
            .unwrap()
    }

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn instant(recorded_at: Timestamp) -> InstantValue {
        InstantValue::builder()
            .sensor_id(SensorId::new("Sensor001").unwrap())
            .reading(Reading::new("20", "C").unwrap())
            .recorded_at(recorded_at)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_refuse_save_when_id_exists() {
        let repo = MemoryRepository::new();
        assert!(repo.save(room("Room001", 0)).await.unwrap().is_some());
        assert!(repo.save(room("Room001", 1)).await.unwrap().is_none());

        let stored = repo.find_by_id(&RoomId::new("Room001").unwrap()).await.unwrap();
        assert_eq!(stored.unwrap().floor, 0);
    }

    #[tokio::test]
    async fn should_refuse_update_when_id_unknown() {
        let repo: MemoryRepository<Room> = MemoryRepository::new();
        assert!(repo.update(room("Room001", 1)).await.unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn should_apply_update_reserved_when_unchanged_since_reservation() {
        let repo = MemoryRepository::new();
        repo.save(room("Room001", 0)).await.unwrap();
        let id = RoomId::new("Room001").unwrap();

        let reservation = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();
        let written = repo
            .update_reserved(reservation, room("Room001", 3))
            .await
            .unwrap();

        assert_eq!(written.unwrap().floor, 3);
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().floor, 3);
    }

    #[tokio::test]
    async fn should_refuse_update_reserved_when_written_since_reservation() {
        let repo = MemoryRepository::new();
        repo.save(room("Room001", 0)).await.unwrap();
        let id = RoomId::new("Room001").unwrap();

        let first = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();
        let second = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();
        repo.update_reserved(first, room("Room001", 1)).await.unwrap().unwrap();

        let result = repo.update_reserved(second, room("Room001", 2)).await.unwrap();
        assert!(result.is_none());
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().floor, 1);
    }

    #[tokio::test]
    async fn should_refuse_update_reserved_for_another_aggregate() {
        let repo = MemoryRepository::new();
        repo.save(room("Room001", 0)).await.unwrap();
        repo.save(room("Room002", 0)).await.unwrap();

        let reservation = repo
            .find_by_id_and_reserve(&RoomId::new("Room001").unwrap())
            .await
            .unwrap()
            .unwrap();
        let result = repo
            .update_reserved(reservation, room("Room002", 5))
            .await
            .unwrap();

        assert!(result.is_none());
        let untouched = repo.find_by_id(&RoomId::new("Room002").unwrap()).await.unwrap();
        assert_eq!(untouched.unwrap().floor, 0);
    }

    #[tokio::test]
    async fn should_invalidate_reservation_after_plain_update() {
        let repo = MemoryRepository::new();
        repo.save(room("Room001", 0)).await.unwrap();
        let id = RoomId::new("Room001").unwrap();

        let reservation = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();
        repo.update(room("Room001", 7)).await.unwrap().unwrap();

        let result = repo
            .update_reserved(reservation, room("Room001", 2))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_exclude_window_bounds_for_instant_values() {
        let repo = MemoryRepository::new();
        for hour in [10, 11, 12] {
            repo.save(instant(at(hour))).await.unwrap();
        }

        let found = repo
            .find_by_sensor_id_between(&SensorId::new("Sensor001").unwrap(), at(10), at(12))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].recorded_at(), at(11));
    }

    #[tokio::test]
    async fn should_include_period_touching_window_bounds() {
        let repo = MemoryRepository::new();
        let period = PeriodValue::builder()
            .sensor_id(SensorId::new("Sensor001").unwrap())
            .reading(Reading::new("300", "W").unwrap())
            .period(at(10), at(12))
            .build()
            .unwrap();
        repo.save(period).await.unwrap();

        let sensor = SensorId::new("Sensor001").unwrap();
        assert_eq!(
            repo.find_by_sensor_id_between(&sensor, at(10), at(12))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            repo.find_by_sensor_id_between(&sensor, at(11), at(12))
                .await
                .unwrap()
                .is_empty()
        );
    }

    // Inserted as T3, T1, T5, T2, T4.
    const SHUFFLED_HOURS: [u32; 5] = [12, 10, 14, 11, 13];

    #[tokio::test]
    async fn should_return_latest_recorded_value_regardless_of_insertion_order() {
        let repo = MemoryRepository::new();
        for hour in SHUFFLED_HOURS {
            let value = InstantValue::builder()
                .sensor_id(SensorId::new("Sensor001").unwrap())
                .reading(Reading::new(hour.to_string(), "C").unwrap())
                .recorded_at(at(hour))
                .build()
                .unwrap();
            repo.save(value).await.unwrap().unwrap();
        }

        let last = repo
            .find_last_value_recorded(&SensorId::new("Sensor001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.recorded_at(), at(14));
        assert_eq!(last.reading().measurement(), "14");
    }

    #[tokio::test]
    async fn should_return_latest_location_value_regardless_of_insertion_order() {
        let repo = MemoryRepository::new();
        for hour in SHUFFLED_HOURS {
            let value = InstantLocationValue::builder()
                .sensor_id(SensorId::new("Sensor001").unwrap())
                .reading(Reading::new(format!("{hour};90"), "km/h;deg").unwrap())
                .recorded_at(at(hour))
                .gps_code(GpsCode::new(41.1, -8.6).unwrap())
                .build()
                .unwrap();
            repo.save(value).await.unwrap().unwrap();
        }

        let last = repo
            .find_last_value_recorded(&SensorId::new("Sensor001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.recorded_at(), at(14));
        assert_eq!(last.reading().measurement(), "14;90");
    }

    #[tokio::test]
    async fn should_include_instant_value_just_after_window_start() {
        let repo = MemoryRepository::new();
        repo.save(instant(at(10) + chrono::Duration::nanoseconds(500)))
            .await
            .unwrap();

        let found = repo
            .find_by_sensor_id_between(&SensorId::new("Sensor001").unwrap(), at(10), at(11))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
