//! `SQLite` implementation of [`ActuatorRepository`].
//!
//! Range properties live in nullable columns; at most one of the integer or
//! decimal column groups is filled for a row.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::capabilities::Capabilities;
use smarthome_app::ports::{ActuatorRepository, Repository, Reserved};
use smarthome_domain::actuator::{
    ActuatorBlueprint, ActuatorProperties, ActuatorRef, DecimalRange, IntegerRange,
};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{ActuatorFunctionalityId, ActuatorId, DeviceId};

use crate::codec::{SqliteQuery, decode_error, decode_version, encode_version, execute};
use crate::error::StorageError;

struct Wrapper(ActuatorBlueprint, u64);

fn decode_properties(row: &SqliteRow) -> Result<ActuatorProperties, sqlx::Error> {
    let lower_int: Option<i64> = row.try_get("lower_int")?;
    let upper_int: Option<i64> = row.try_get("upper_int")?;
    let lower_decimal: Option<f64> = row.try_get("lower_decimal")?;
    let upper_decimal: Option<f64> = row.try_get("upper_decimal")?;
    let precision: Option<i64> = row.try_get("precision")?;

    if let (Some(lower), Some(upper)) = (lower_int, upper_int) {
        return Ok(ActuatorProperties::IntegerRange(
            IntegerRange::new(lower, upper).map_err(decode_error)?,
        ));
    }
    if let (Some(lower), Some(upper), Some(precision)) = (lower_decimal, upper_decimal, precision) {
        let precision = u32::try_from(precision).map_err(decode_error)?;
        return Ok(ActuatorProperties::DecimalRange(
            DecimalRange::new(lower, upper, precision).map_err(decode_error)?,
        ));
    }
    Ok(ActuatorProperties::None)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let functionality_id: String = row.try_get("functionality_id")?;
        let device_id: String = row.try_get("device_id")?;
        let version: i64 = row.try_get("version")?;

        Ok(Self(
            ActuatorBlueprint {
                id: ActuatorId::from_str(&id).map_err(decode_error)?,
                functionality_id: ActuatorFunctionalityId::from_str(&functionality_id)
                    .map_err(decode_error)?,
                properties: decode_properties(row)?,
                device_id: DeviceId::from_str(&device_id).map_err(decode_error)?,
            },
            decode_version(version)?,
        ))
    }
}

const INSERT: &str = r"
    INSERT INTO actuators (
        functionality_id, device_id, lower_int, upper_int,
        lower_decimal, upper_decimal, precision, id
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";
const UPDATE: &str = r"
    UPDATE actuators
    SET functionality_id = ?, device_id = ?, lower_int = ?, upper_int = ?,
        lower_decimal = ?, upper_decimal = ?, precision = ?, version = version + 1
    WHERE id = ?
";
const UPDATE_RESERVED: &str = r"
    UPDATE actuators
    SET functionality_id = ?, device_id = ?, lower_int = ?, upper_int = ?,
        lower_decimal = ?, upper_decimal = ?, precision = ?, version = version + 1
    WHERE id = ? AND version = ?
";
const SELECT_BY_ID: &str = "SELECT * FROM actuators WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM actuators ORDER BY id";
const SELECT_BY_DEVICE: &str = "SELECT * FROM actuators WHERE device_id = ? ORDER BY id";
const SELECT_BY_FUNCTIONALITY: &str =
    "SELECT * FROM actuators WHERE functionality_id = ? ORDER BY id";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM actuators WHERE id = ?)";

fn bind_actuator<'q>(query: SqliteQuery<'q>, actuator: &ActuatorRef) -> SqliteQuery<'q> {
    let (integer, decimal) = match *actuator.properties() {
        ActuatorProperties::None => (None, None),
        ActuatorProperties::IntegerRange(range) => (Some(range), None),
        ActuatorProperties::DecimalRange(range) => (None, Some(range)),
    };
    query
        .bind(actuator.functionality_id().to_string())
        .bind(actuator.device_id().to_string())
        .bind(integer.map(|r| r.lower()))
        .bind(integer.map(|r| r.upper()))
        .bind(decimal.map(|r| r.lower()))
        .bind(decimal.map(|r| r.upper()))
        .bind(decimal.map(|r| i64::from(r.precision())))
        .bind(actuator.id().to_string())
}

/// `SQLite`-backed actuator repository.
#[derive(Clone)]
pub struct SqliteActuatorRepository {
    pool: SqlitePool,
    capabilities: Capabilities,
}

impl SqliteActuatorRepository {
    /// Create a new repository rebuilding actuators with `capabilities`.
    #[must_use]
    pub fn new(pool: SqlitePool, capabilities: Capabilities) -> Self {
        Self { pool, capabilities }
    }

    fn rebuild(&self, blueprint: ActuatorBlueprint) -> Option<ActuatorRef> {
        let id = blueprint.id.clone();
        let implementation = self
            .capabilities
            .actuators
            .implementation_name_for(&blueprint.functionality_id);
        match self
            .capabilities
            .actuator_factory
            .try_create(implementation, blueprint)
        {
            Ok(actuator) => Some(actuator),
            Err(err) => {
                tracing::warn!(actuator_id = %id, error = %err, "skipping actuator row that cannot be rebuilt");
                None
            }
        }
    }

    async fn fetch(&self, id: &ActuatorId) -> Result<Option<(ActuatorRef, u64)>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.and_then(|Wrapper(blueprint, version)| {
            self.rebuild(blueprint).map(|actuator| (actuator, version))
        }))
    }

    async fn fetch_all(&self, query: SqliteQuery<'_>) -> Result<Vec<ActuatorRef>, SmartHomeError> {
        let rows = query.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        let mut actuators = Vec::with_capacity(rows.len());
        for row in &rows {
            let Wrapper(blueprint, _) = Wrapper::from_row(row).map_err(StorageError::from)?;
            actuators.extend(self.rebuild(blueprint));
        }
        Ok(actuators)
    }
}

impl Repository<ActuatorRef> for SqliteActuatorRepository {
    fn save(
        &self,
        actuator: ActuatorRef,
    ) -> impl Future<Output = Result<Option<ActuatorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, bind_actuator(sqlx::query(INSERT), &actuator)).await?;
            Ok(inserted.then_some(actuator))
        }
    }

    fn update(
        &self,
        actuator: ActuatorRef,
    ) -> impl Future<Output = Result<Option<ActuatorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, bind_actuator(sqlx::query(UPDATE), &actuator)).await?;
            Ok(updated.then_some(actuator))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<ActuatorRef>,
        actuator: ActuatorRef,
    ) -> impl Future<Output = Result<Option<ActuatorRef>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&actuator) {
                return Ok(None);
            }
            let query = bind_actuator(sqlx::query(UPDATE_RESERVED), &actuator)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(actuator))
        }
    }

    fn find_by_id(
        &self,
        id: &ActuatorId,
    ) -> impl Future<Output = Result<Option<ActuatorRef>, SmartHomeError>> + Send {
        async move { Ok(self.fetch(id).await?.map(|(actuator, _)| actuator)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &ActuatorId,
    ) -> impl Future<Output = Result<Option<Reserved<ActuatorRef>>, SmartHomeError>> + Send {
        async move {
            Ok(self
                .fetch(id)
                .await?
                .map(|(actuator, version)| Reserved::new(actuator, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_ALL))
    }

    fn contains_by_id(
        &self,
        id: &ActuatorId,
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

impl ActuatorRepository for SqliteActuatorRepository {
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_BY_DEVICE).bind(device_id.to_string()))
    }

    fn find_by_functionality_id(
        &self,
        functionality_id: &ActuatorFunctionalityId,
    ) -> impl Future<Output = Result<Vec<ActuatorRef>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_BY_FUNCTIONALITY).bind(functionality_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use crate::sensor_repo::tests::TestSource;

    async fn setup() -> SqliteActuatorRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteActuatorRepository::new(db.pool().clone(), Capabilities::load(&TestSource))
    }

    fn actuator(
        repo: &SqliteActuatorRepository,
        id: &str,
        functionality: &str,
        properties: ActuatorProperties,
    ) -> ActuatorRef {
        repo.rebuild(ActuatorBlueprint {
            id: ActuatorId::new(id).unwrap(),
            functionality_id: ActuatorFunctionalityId::new(functionality).unwrap(),
            properties,
            device_id: DeviceId::new("Device001").unwrap(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn should_preserve_decimal_range_through_roundtrip() {
        let repo = setup().await;
        let range = DecimalRange::new(15.5, 30.0, 1).unwrap();
        repo.save(actuator(
            &repo,
            "Actuator001",
            "DecimalSetter",
            ActuatorProperties::DecimalRange(range),
        ))
        .await
        .unwrap()
        .unwrap();

        let fetched = repo
            .find_by_id(&ActuatorId::new("Actuator001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.kind(), "DecimalSetterActuator");
        assert_eq!(fetched.properties(), &ActuatorProperties::DecimalRange(range));
    }

    #[tokio::test]
    async fn should_preserve_integer_range_through_roundtrip() {
        let repo = setup().await;
        let range = IntegerRange::new(-5, 5).unwrap();
        repo.save(actuator(
            &repo,
            "Actuator001",
            "IntegerSetter",
            ActuatorProperties::IntegerRange(range),
        ))
        .await
        .unwrap();

        let fetched = repo
            .find_by_device_id(&DeviceId::new("Device001").unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].properties(), &ActuatorProperties::IntegerRange(range));
    }

    #[tokio::test]
    async fn should_find_actuators_by_functionality() {
        let repo = setup().await;
        repo.save(actuator(&repo, "Actuator001", "Switch", ActuatorProperties::None))
            .await
            .unwrap();
        repo.save(actuator(&repo, "Actuator002", "Switch", ActuatorProperties::None))
            .await
            .unwrap();

        let switches = repo
            .find_by_functionality_id(&ActuatorFunctionalityId::new("Switch").unwrap())
            .await
            .unwrap();
        assert_eq!(switches.len(), 2);
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }
}
