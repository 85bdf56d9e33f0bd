//! `SQLite` implementation of [`SensorRepository`].
//!
//! Only the canonical construction parameters are stored. Rows are turned
//! back into sensors through the capability registry and the sensor factory,
//! so a row whose functionality is no longer configured is skipped.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::capabilities::Capabilities;
use smarthome_app::ports::{Repository, Reserved, SensorRepository};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{DeviceId, SensorFunctionalityId, SensorId};
use smarthome_domain::sensor::{SensorBlueprint, SensorRef};

use crate::codec::{SqliteQuery, decode_error, decode_version, encode_version, execute};
use crate::error::StorageError;

struct Wrapper(SensorBlueprint, u64);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let functionality_id: String = row.try_get("functionality_id")?;
        let device_id: String = row.try_get("device_id")?;
        let version: i64 = row.try_get("version")?;

        Ok(Self(
            SensorBlueprint {
                id: SensorId::from_str(&id).map_err(decode_error)?,
                functionality_id: SensorFunctionalityId::from_str(&functionality_id)
                    .map_err(decode_error)?,
                device_id: DeviceId::from_str(&device_id).map_err(decode_error)?,
            },
            decode_version(version)?,
        ))
    }
}

const INSERT: &str = r"
    INSERT INTO sensors (functionality_id, device_id, id) VALUES (?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";
const UPDATE: &str = r"
    UPDATE sensors SET functionality_id = ?, device_id = ?, version = version + 1
    WHERE id = ?
";
const UPDATE_RESERVED: &str = r"
    UPDATE sensors SET functionality_id = ?, device_id = ?, version = version + 1
    WHERE id = ? AND version = ?
";
const SELECT_BY_ID: &str = "SELECT * FROM sensors WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM sensors ORDER BY id";
const SELECT_BY_DEVICE: &str = "SELECT * FROM sensors WHERE device_id = ? ORDER BY id";
const SELECT_BY_FUNCTIONALITY: &str =
    "SELECT * FROM sensors WHERE functionality_id = ? ORDER BY id";
const SELECT_BY_DEVICE_AND_FUNCTIONALITY: &str =
    "SELECT * FROM sensors WHERE device_id = ? AND functionality_id = ? ORDER BY id";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM sensors WHERE id = ?)";

fn bind_sensor<'q>(query: SqliteQuery<'q>, sensor: &SensorRef) -> SqliteQuery<'q> {
    query
        .bind(sensor.functionality_id().to_string())
        .bind(sensor.device_id().to_string())
        .bind(sensor.id().to_string())
}

/// `SQLite`-backed sensor repository.
#[derive(Clone)]
pub struct SqliteSensorRepository {
    pool: SqlitePool,
    capabilities: Capabilities,
}

impl SqliteSensorRepository {
    /// Create a new repository rebuilding sensors with `capabilities`.
    #[must_use]
    pub fn new(pool: SqlitePool, capabilities: Capabilities) -> Self {
        Self { pool, capabilities }
    }

    fn rebuild(&self, blueprint: SensorBlueprint) -> Option<SensorRef> {
        let id = blueprint.id.clone();
        let implementation = self
            .capabilities
            .sensors
            .implementation_name_for(&blueprint.functionality_id);
        match self
            .capabilities
            .sensor_factory
            .try_create(implementation, blueprint)
        {
            Ok(sensor) => Some(sensor),
            Err(err) => {
                tracing::warn!(sensor_id = %id, error = %err, "skipping sensor row that cannot be rebuilt");
                None
            }
        }
    }

    async fn fetch(&self, id: &SensorId) -> Result<Option<(SensorRef, u64)>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.and_then(|Wrapper(blueprint, version)| {
            self.rebuild(blueprint).map(|sensor| (sensor, version))
        }))
    }

    async fn fetch_all(&self, query: SqliteQuery<'_>) -> Result<Vec<SensorRef>, SmartHomeError> {
        let rows = query.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        let mut sensors = Vec::with_capacity(rows.len());
        for row in &rows {
            let Wrapper(blueprint, _) = Wrapper::from_row(row).map_err(StorageError::from)?;
            sensors.extend(self.rebuild(blueprint));
        }
        Ok(sensors)
    }
}

impl Repository<SensorRef> for SqliteSensorRepository {
    fn save(
        &self,
        sensor: SensorRef,
    ) -> impl Future<Output = Result<Option<SensorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, bind_sensor(sqlx::query(INSERT), &sensor)).await?;
            Ok(inserted.then_some(sensor))
        }
    }

    fn update(
        &self,
        sensor: SensorRef,
    ) -> impl Future<Output = Result<Option<SensorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, bind_sensor(sqlx::query(UPDATE), &sensor)).await?;
            Ok(updated.then_some(sensor))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<SensorRef>,
        sensor: SensorRef,
    ) -> impl Future<Output = Result<Option<SensorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&sensor) {
                return Ok(None);
            }
            let query = bind_sensor(sqlx::query(UPDATE_RESERVED), &sensor)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(sensor))
        }
    }

    fn find_by_id(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<SensorRef>, SmartHomeError>> + Send {
        async move { Ok(self.fetch(id).await?.map(|(sensor, _)| sensor)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<Reserved<SensorRef>>, SmartHomeError>> + Send {
        async move {
            Ok(self
                .fetch(id)
                .await?
                .map(|(sensor, version)| Reserved::new(sensor, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_ALL))
    }

    fn contains_by_id(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let exists: bool = sqlx::query_scalar(EXISTS)
                .bind(id)
                .fetch_one(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(exists)
        }
    }
}

impl SensorRepository for SqliteSensorRepository {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_BY_DEVICE).bind(device_id.to_string()))
    }

    fn find_by_functionality_id(
        &self,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_BY_FUNCTIONALITY).bind(functionality_id.to_string()))
    }

    fn find_by_device_id_and_functionality_id(
        &self,
        device_id: &DeviceId,
        functionality_id: &SensorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<SensorRef>, SmartHomeError>> + Send {
        self.fetch_all(
            sqlx::query(SELECT_BY_DEVICE_AND_FUNCTIONALITY)
                .bind(device_id.to_string())
                .bind(functionality_id.to_string()),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use smarthome_app::ports::{CapabilitySource, GeneralSettings};
    use smarthome_domain::registry::CapabilityTable;

    use super::*;
    use crate::pool::Config;

    /// Small fixed configuration shared by the adapter tests.
    pub(crate) struct TestSource;

    fn table(rows: &[(&str, &str)]) -> CapabilityTable {
        let mut table = CapabilityTable::default();
        for (functionality, implementation) in rows {
            table.functionalities.push((*functionality).to_string());
            table
                .implementations
                .insert((*functionality).to_string(), (*implementation).to_string());
        }
        table
    }

    impl CapabilitySource for TestSource {
        fn sensor_table(&self) -> CapabilityTable {
            table(&[
                ("TemperatureCelsius", "TemperatureCelsiusSensor"),
                ("HumidityPercentage", "HumidityPercentageSensor"),
            ])
        }

        fn actuator_table(&self) -> CapabilityTable {
            table(&[
                ("Switch", "SwitchActuator"),
                ("IntegerSetter", "IntegerSetterActuator"),
                ("DecimalSetter", "DecimalSetterActuator"),
            ])
        }

        fn general_settings(&self) -> GeneralSettings {
            GeneralSettings::default()
        }
    }

    async fn setup() -> SqliteSensorRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteSensorRepository::new(db.pool().clone(), Capabilities::load(&TestSource))
    }

    fn sensor(repo: &SqliteSensorRepository, id: &str, device: &str, functionality: &str) -> SensorRef {
        repo.rebuild(SensorBlueprint {
            id: SensorId::new(id).unwrap(),
            functionality_id: SensorFunctionalityId::new(functionality).unwrap(),
            device_id: DeviceId::new(device).unwrap(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn should_rebuild_sensor_kind_from_registry() {
        let repo = setup().await;
        let saved = sensor(&repo, "Sensor001", "Device001", "HumidityPercentage");
        repo.save(saved).await.unwrap().unwrap();

        let fetched = repo
            .find_by_id(&SensorId::new("Sensor001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.kind(), "HumidityPercentageSensor");
        assert_eq!(fetched.device_id().as_str(), "Device001");
    }

    #[tokio::test]
    async fn should_skip_rows_whose_functionality_is_no_longer_configured() {
        let repo = setup().await;
        repo.save(sensor(&repo, "Sensor001", "Device001", "TemperatureCelsius"))
            .await
            .unwrap();
        sqlx::query("INSERT INTO sensors (id, functionality_id, device_id) VALUES ('Sensor002', 'Radiation', 'Device001')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let listed = repo
            .find_by_device_id(&DeviceId::new("Device001").unwrap())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(
            repo.find_by_id(&SensorId::new("Sensor002").unwrap())
                .await
                .unwrap()
                .is_none()
        );
        // The row is still there and still blocks its id.
        assert!(repo.contains_by_id(&SensorId::new("Sensor002").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn should_find_sensors_by_device_and_functionality() {
        let repo = setup().await;
        for (id, device, functionality) in [
            ("Sensor001", "Device001", "TemperatureCelsius"),
            ("Sensor002", "Device001", "HumidityPercentage"),
            ("Sensor003", "Device002", "TemperatureCelsius"),
        ] {
            repo.save(sensor(&repo, id, device, functionality)).await.unwrap();
        }
        let temperature = SensorFunctionalityId::new("TemperatureCelsius").unwrap();

        assert_eq!(repo.find_by_functionality_id(&temperature).await.unwrap().len(), 2);
        let matched = repo
            .find_by_device_id_and_functionality_id(&DeviceId::new("Device001").unwrap(), &temperature)
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id().as_str(), "Sensor001");
    }

    #[tokio::test]
    async fn should_return_none_when_saving_duplicate_sensor() {
        let repo = setup().await;
        repo.save(sensor(&repo, "Sensor001", "Device001", "TemperatureCelsius"))
            .await
            .unwrap();
        let duplicate = repo
            .save(sensor(&repo, "Sensor001", "Device002", "HumidityPercentage"))
            .await
            .unwrap();
        assert!(duplicate.is_none());
    }
}
