//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::{DeviceRepository, Repository, Reserved};
use smarthome_domain::device::{Device, DeviceStatus};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{DeviceId, RoomId};

use crate::codec::{SqliteQuery, decode_error, decode_version, encode_version, execute};
use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device, u64);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let room_id: String = row.try_get("room_id")?;
        let model: String = row.try_get("model")?;
        let status: String = row.try_get("status")?;
        let version: i64 = row.try_get("version")?;

        let id = DeviceId::from_str(&id).map_err(decode_error)?;
        let room_id = RoomId::from_str(&room_id).map_err(decode_error)?;
        let status = DeviceStatus::from_str(&status).map_err(decode_error)?;

        Ok(Self(
            Device {
                id,
                room_id,
                model,
                status,
            },
            decode_version(version)?,
        ))
    }
}

const INSERT: &str = r"
    INSERT INTO devices (room_id, model, status, id) VALUES (?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";
const UPDATE: &str = r"
    UPDATE devices SET room_id = ?, model = ?, status = ?, version = version + 1
    WHERE id = ?
";
const UPDATE_RESERVED: &str = r"
    UPDATE devices SET room_id = ?, model = ?, status = ?, version = version + 1
    WHERE id = ? AND version = ?
";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY id";
const SELECT_BY_ROOM: &str = "SELECT * FROM devices WHERE room_id = ? ORDER BY id";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM devices WHERE id = ?)";

fn bind_device<'q>(query: SqliteQuery<'q>, device: &Device) -> SqliteQuery<'q> {
    query
        .bind(device.room_id.to_string())
        .bind(device.model.clone())
        .bind(device.status.as_str())
        .bind(device.id.to_string())
}

/// `SQLite`-backed device repository.
#[derive(Clone)]
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &DeviceId) -> Result<Option<Wrapper>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row)
    }
}

impl Repository<Device> for SqliteDeviceRepository {
    fn save(&self, device: Device) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, bind_device(sqlx::query(INSERT), &device)).await?;
            Ok(inserted.then_some(device))
        }
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, bind_device(sqlx::query(UPDATE), &device)).await?;
            Ok(updated.then_some(device))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<Device>,
        device: Device,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&device) {
                return Ok(None);
            }
            let query = bind_device(sqlx::query(UPDATE_RESERVED), &device)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(device))
        }
    }

    fn find_by_id(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, SmartHomeError>> + Send {
        async move { Ok(self.fetch(id).await?.map(|row| row.0)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Reserved<Device>>, SmartHomeError>> + Send {
        async move {
            Ok(self
                .fetch(id)
                .await?
                .map(|Wrapper(device, version)| Reserved::new(device, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn contains_by_id(
        &self,
        id: &DeviceId,
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

impl DeviceRepository for SqliteDeviceRepository {
    fn find_by_room_id(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Vec<Device>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        let room_id = room_id.to_string();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_ROOM)
                .bind(room_id)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}
