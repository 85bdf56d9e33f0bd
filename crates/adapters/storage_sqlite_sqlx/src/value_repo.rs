//! `SQLite` implementation of the time-series value repositories.
//!
//! The three value shapes share one generic repository; each shape describes
//! its own table through [`ValueTable`]. The window semantics live in the
//! `SELECT_BETWEEN` statements: instant shapes exclude both bounds, periods
//! must lie inside the window with bounds included.

use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::{InstantValueRepository, Repository, Reserved, ValueRepository};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{SensorId, ValueId};
use smarthome_domain::location::GpsCode;
use smarthome_domain::reading::Reading;
use smarthome_domain::time::Timestamp;
use smarthome_domain::value::{
    InstantLocationValue, InstantSeriesValue, InstantValue, PeriodValue, TimeSeriesValue,
};

use crate::codec::{
    SqliteQuery, decode_error, decode_timestamp, decode_version, encode_timestamp,
    encode_version, execute,
};
use crate::error::StorageError;

/// How a value shape maps onto its table.
pub trait ValueTable: TimeSeriesValue {
    /// Insert with every column bound by [`bind_columns`](Self::bind_columns).
    const INSERT: &'static str;
    const UPDATE: &'static str;
    /// Like `UPDATE` with a trailing version condition.
    const UPDATE_RESERVED: &'static str;
    const SELECT_BY_ID: &'static str;
    const SELECT_ALL: &'static str;
    const SELECT_BY_SENSOR: &'static str;
    /// Bound with the sensor id, the window start and the window end.
    const SELECT_BETWEEN: &'static str;
    const EXISTS: &'static str;

    /// Bind the value columns in statement order, the id last.
    fn bind_columns<'q>(query: SqliteQuery<'q>, value: &Self) -> SqliteQuery<'q>;

    /// Rebuild the value from a row.
    ///
    /// # Errors
    ///
    /// Returns a decode error when a column holds an invalid value.
    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Value shapes recorded at a single instant.
pub trait InstantValueTable: ValueTable + InstantSeriesValue {
    /// Bound with the sensor id, returns at most the latest row.
    const SELECT_LAST: &'static str;
}

struct Wrapper<V>(V, u64);

impl<'r, V: ValueTable> FromRow<'r, SqliteRow> for Wrapper<V> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let version: i64 = row.try_get("version")?;
        Ok(Self(V::decode(row)?, decode_version(version)?))
    }
}

fn decode_common(row: &SqliteRow) -> Result<(ValueId, SensorId, Reading), sqlx::Error> {
    let id: String = row.try_get("id")?;
    let sensor_id: String = row.try_get("sensor_id")?;
    let measurement: String = row.try_get("measurement")?;
    let unit: String = row.try_get("unit")?;

    Ok((
        ValueId::from_str(&id).map_err(decode_error)?,
        SensorId::from_str(&sensor_id).map_err(decode_error)?,
        Reading::new(measurement, unit).map_err(decode_error)?,
    ))
}

impl ValueTable for InstantValue {
    const INSERT: &'static str = r"
        INSERT INTO instant_values (sensor_id, measurement, unit, recorded_at, id)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (id) DO NOTHING
    ";
    const UPDATE: &'static str = r"
        UPDATE instant_values
        SET sensor_id = ?, measurement = ?, unit = ?, recorded_at = ?, version = version + 1
        WHERE id = ?
    ";
    const UPDATE_RESERVED: &'static str = r"
        UPDATE instant_values
        SET sensor_id = ?, measurement = ?, unit = ?, recorded_at = ?, version = version + 1
        WHERE id = ? AND version = ?
    ";
    const SELECT_BY_ID: &'static str = "SELECT * FROM instant_values WHERE id = ?";
    const SELECT_ALL: &'static str = "SELECT * FROM instant_values ORDER BY recorded_at";
    const SELECT_BY_SENSOR: &'static str =
        "SELECT * FROM instant_values WHERE sensor_id = ? ORDER BY recorded_at";
    const SELECT_BETWEEN: &'static str = r"
        SELECT * FROM instant_values
        WHERE sensor_id = ? AND recorded_at > ? AND recorded_at < ?
        ORDER BY recorded_at
    ";
    const EXISTS: &'static str = "SELECT EXISTS (SELECT 1 FROM instant_values WHERE id = ?)";

    fn bind_columns<'q>(query: SqliteQuery<'q>, value: &Self) -> SqliteQuery<'q> {
        query
            .bind(value.sensor_id().to_string())
            .bind(value.reading().measurement().to_string())
            .bind(value.reading().unit().to_string())
            .bind(encode_timestamp(value.recorded_at()))
            .bind(value.id().to_string())
    }

    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let (id, sensor_id, reading) = decode_common(row)?;
        let recorded_at: String = row.try_get("recorded_at")?;
        InstantValue::builder()
            .id(id)
            .sensor_id(sensor_id)
            .reading(reading)
            .recorded_at(decode_timestamp(&recorded_at)?)
            .build()
            .map_err(decode_error)
    }
}

impl InstantValueTable for InstantValue {
    const SELECT_LAST: &'static str = r"
        SELECT * FROM instant_values WHERE sensor_id = ?
        ORDER BY recorded_at DESC LIMIT 1
    ";
}

impl ValueTable for InstantLocationValue {
    const INSERT: &'static str = r"
        INSERT INTO instant_location_values
            (sensor_id, measurement, unit, recorded_at, latitude, longitude, id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO NOTHING
    ";
    const UPDATE: &'static str = r"
        UPDATE instant_location_values
        SET sensor_id = ?, measurement = ?, unit = ?, recorded_at = ?,
            latitude = ?, longitude = ?, version = version + 1
        WHERE id = ?
    ";
    const UPDATE_RESERVED: &'static str = r"
        UPDATE instant_location_values
        SET sensor_id = ?, measurement = ?, unit = ?, recorded_at = ?,
            latitude = ?, longitude = ?, version = version + 1
        WHERE id = ? AND version = ?
    ";
    const SELECT_BY_ID: &'static str = "SELECT * FROM instant_location_values WHERE id = ?";
    const SELECT_ALL: &'static str =
        "SELECT * FROM instant_location_values ORDER BY recorded_at";
    const SELECT_BY_SENSOR: &'static str =
        "SELECT * FROM instant_location_values WHERE sensor_id = ? ORDER BY recorded_at";
    const SELECT_BETWEEN: &'static str = r"
        SELECT * FROM instant_location_values
        WHERE sensor_id = ? AND recorded_at > ? AND recorded_at < ?
        ORDER BY recorded_at
    ";
    const EXISTS: &'static str =
        "SELECT EXISTS (SELECT 1 FROM instant_location_values WHERE id = ?)";

    fn bind_columns<'q>(query: SqliteQuery<'q>, value: &Self) -> SqliteQuery<'q> {
        query
            .bind(value.sensor_id().to_string())
            .bind(value.reading().measurement().to_string())
            .bind(value.reading().unit().to_string())
            .bind(encode_timestamp(value.recorded_at()))
            .bind(value.gps_code().latitude())
            .bind(value.gps_code().longitude())
            .bind(value.id().to_string())
    }

    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let (id, sensor_id, reading) = decode_common(row)?;
        let recorded_at: String = row.try_get("recorded_at")?;
        let latitude: f64 = row.try_get("latitude")?;
        let longitude: f64 = row.try_get("longitude")?;
        InstantLocationValue::builder()
            .id(id)
            .sensor_id(sensor_id)
            .reading(reading)
            .recorded_at(decode_timestamp(&recorded_at)?)
            .gps_code(GpsCode::new(latitude, longitude).map_err(decode_error)?)
            .build()
            .map_err(decode_error)
    }
}

impl InstantValueTable for InstantLocationValue {
    const SELECT_LAST: &'static str = r"
        SELECT * FROM instant_location_values WHERE sensor_id = ?
        ORDER BY recorded_at DESC LIMIT 1
    ";
}

impl ValueTable for PeriodValue {
    const INSERT: &'static str = r"
        INSERT INTO period_values (sensor_id, measurement, unit, start_at, end_at, id)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO NOTHING
    ";
    const UPDATE: &'static str = r"
        UPDATE period_values
        SET sensor_id = ?, measurement = ?, unit = ?, start_at = ?, end_at = ?,
            version = version + 1
        WHERE id = ?
    ";
    const UPDATE_RESERVED: &'static str = r"
        UPDATE period_values
        SET sensor_id = ?, measurement = ?, unit = ?, start_at = ?, end_at = ?,
            version = version + 1
        WHERE id = ? AND version = ?
    ";
    const SELECT_BY_ID: &'static str = "SELECT * FROM period_values WHERE id = ?";
    const SELECT_ALL: &'static str = "SELECT * FROM period_values ORDER BY start_at";
    const SELECT_BY_SENSOR: &'static str =
        "SELECT * FROM period_values WHERE sensor_id = ? ORDER BY start_at";
    const SELECT_BETWEEN: &'static str = r"
        SELECT * FROM period_values
        WHERE sensor_id = ? AND start_at >= ? AND end_at <= ?
        ORDER BY start_at
    ";
    const EXISTS: &'static str = "SELECT EXISTS (SELECT 1 FROM period_values WHERE id = ?)";

    fn bind_columns<'q>(query: SqliteQuery<'q>, value: &Self) -> SqliteQuery<'q> {
        query
            .bind(value.sensor_id().to_string())
            .bind(value.reading().measurement().to_string())
            .bind(value.reading().unit().to_string())
            .bind(encode_timestamp(value.start()))
            .bind(encode_timestamp(value.end()))
            .bind(value.id().to_string())
    }

    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let (id, sensor_id, reading) = decode_common(row)?;
        let start: String = row.try_get("start_at")?;
        let end: String = row.try_get("end_at")?;
        PeriodValue::builder()
            .id(id)
            .sensor_id(sensor_id)
            .reading(reading)
            .period(decode_timestamp(&start)?, decode_timestamp(&end)?)
            .build()
            .map_err(decode_error)
    }
}

/// `SQLite`-backed repository for one value shape.
pub struct SqliteValueRepository<V> {
    pool: SqlitePool,
    shape: PhantomData<fn() -> V>,
}

impl<V> Clone for SqliteValueRepository<V> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            shape: PhantomData,
        }
    }
}

impl<V: ValueTable> SqliteValueRepository<V> {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            shape: PhantomData,
        }
    }

    async fn fetch_one(&self, query: SqliteQuery<'_>) -> Result<Option<Wrapper<V>>, SmartHomeError> {
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.as_ref()
            .map(Wrapper::<V>::from_row)
            .transpose()
            .map_err(|err| StorageError::from(err).into())
    }

    async fn fetch_all(&self, query: SqliteQuery<'_>) -> Result<Vec<V>, SmartHomeError> {
        let rows = query.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        rows.iter()
            .map(V::decode)
            .collect::<Result<_, _>>()
            .map_err(|err| StorageError::from(err).into())
    }
}

impl<V: ValueTable> Repository<V> for SqliteValueRepository<V> {
    fn save(&self, value: V) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, V::bind_columns(sqlx::query(V::INSERT), &value)).await?;
            Ok(inserted.then_some(value))
        }
    }

    fn update(&self, value: V) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, V::bind_columns(sqlx::query(V::UPDATE), &value)).await?;
            Ok(updated.then_some(value))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<V>,
        value: V,
    ) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&value) {
                return Ok(None);
            }
            let query = V::bind_columns(sqlx::query(V::UPDATE_RESERVED), &value)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(value))
        }
    }

    fn find_by_id(
        &self,
        id: &ValueId,
    ) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let query = sqlx::query(V::SELECT_BY_ID).bind(id.to_string());
        async move { Ok(self.fetch_one(query).await?.map(|row| row.0)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &ValueId,
    ) -> impl Future<Output = Result<Option<Reserved<V>>, SmartHomeError>> + Send {
        let query = sqlx::query(V::SELECT_BY_ID).bind(id.to_string());
        async move {
            Ok(self
                .fetch_one(query)
                .await?
                .map(|Wrapper(value, version)| Reserved::new(value, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(V::SELECT_ALL))
    }

    fn contains_by_id(
        &self,
        id: &ValueId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let exists: bool = sqlx::query_scalar(V::EXISTS)
                .bind(id)
                .fetch_one(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(exists)
        }
    }
}

impl<V: ValueTable> ValueRepository<V> for SqliteValueRepository<V> {
    fn find_by_sensor_id(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(V::SELECT_BY_SENSOR).bind(sensor_id.to_string()))
    }

    fn find_by_sensor_id_between(
        &self,
        sensor_id: &SensorId,
        start: Timestamp,
        end: Timestamp,
    ) -> impl Future<Output = Result<Vec<V>, SmartHomeError>> + Send {
        self.fetch_all(
            sqlx::query(V::SELECT_BETWEEN)
                .bind(sensor_id.to_string())
                .bind(encode_timestamp(start))
                .bind(encode_timestamp(end)),
        )
    }
}

impl<V: InstantValueTable> InstantValueRepository<V> for SqliteValueRepository<V> {
    fn find_last_value_recorded(
        &self,
        sensor_id: &SensorId,
    ) -> impl Future<Output = Result<Option<V>, SmartHomeError>> + Send {
        let query = sqlx::query(V::SELECT_LAST).bind(sensor_id.to_string());
        async move { Ok(self.fetch_one(query).await?.map(|row| row.0)) }
    }
}
