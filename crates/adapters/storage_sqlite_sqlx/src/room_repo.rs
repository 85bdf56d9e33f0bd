//! `SQLite` implementation of [`RoomRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::{Repository, Reserved, RoomRepository};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{HouseId, RoomId};
use smarthome_domain::room::{Room, RoomDimensions};

use crate::codec::{SqliteQuery, decode_error, decode_version, encode_version, execute};
use crate::error::StorageError;

struct Wrapper(Room, u64);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let house_id: String = row.try_get("house_id")?;
        let floor: i32 = row.try_get("floor")?;
        let length: f64 = row.try_get("length")?;
        let width: f64 = row.try_get("width")?;
        let height: f64 = row.try_get("height")?;
        let version: i64 = row.try_get("version")?;

        Ok(Self(
            Room {
                id: RoomId::from_str(&id).map_err(decode_error)?,
                house_id: HouseId::from_str(&house_id).map_err(decode_error)?,
                floor,
                dimensions: RoomDimensions::new(length, width, height).map_err(decode_error)?,
            },
            decode_version(version)?,
        ))
    }
}

const INSERT: &str = r"
    INSERT INTO rooms (house_id, floor, length, width, height, id)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";
const UPDATE: &str = r"
    UPDATE rooms
    SET house_id = ?, floor = ?, length = ?, width = ?, height = ?, version = version + 1
    WHERE id = ?
";
const UPDATE_RESERVED: &str = r"
    UPDATE rooms
    SET house_id = ?, floor = ?, length = ?, width = ?, height = ?, version = version + 1
    WHERE id = ? AND version = ?
";
const SELECT_BY_ID: &str = "SELECT * FROM rooms WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM rooms ORDER BY id";
const SELECT_BY_HOUSE: &str = "SELECT * FROM rooms WHERE house_id = ? ORDER BY id";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM rooms WHERE id = ?)";

fn bind_room<'q>(query: SqliteQuery<'q>, room: &Room) -> SqliteQuery<'q> {
    query
        .bind(room.house_id.to_string())
        .bind(room.floor)
        .bind(room.dimensions.length)
        .bind(room.dimensions.width)
        .bind(room.dimensions.height)
        .bind(room.id.to_string())
}

/// `SQLite`-backed room repository.
#[derive(Clone)]
pub struct SqliteRoomRepository {
    pool: SqlitePool,
}

impl SqliteRoomRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &RoomId) -> Result<Option<Wrapper>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row)
    }

    async fn fetch_all(&self, query: SqliteQuery<'_>) -> Result<Vec<Room>, SmartHomeError> {
        let rows = query.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        rows.iter()
            .map(|row| Wrapper::from_row(row).map(|w| w.0))
            .collect::<Result<_, _>>()
            .map_err(|err| StorageError::from(err).into())
    }
}

impl Repository<Room> for SqliteRoomRepository {
    fn save(&self, room: Room) -> impl Future<Output = Result<Option<Room>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, bind_room(sqlx::query(INSERT), &room)).await?;
            Ok(inserted.then_some(room))
        }
    }

    fn update(&self, room: Room) -> impl Future<Output = Result<Option<Room>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, bind_room(sqlx::query(UPDATE), &room)).await?;
            Ok(updated.then_some(room))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<Room>,
        room: Room,
    ) -> impl Future<Output = Result<Option<Room>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&room) {
                return Ok(None);
            }
            let query = bind_room(sqlx::query(UPDATE_RESERVED), &room)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(room))
        }
    }

    fn find_by_id(
        &self,
        id: &RoomId,
    ) -> impl Future<Output = Result<Option<Room>, SmartHomeError>> + Send {
        async move { Ok(self.fetch(id).await?.map(|row| row.0)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &RoomId,
    ) -> impl Future<Output = Result<Option<Reserved<Room>>, SmartHomeError>> + Send {
        async move {
            Ok(self
                .fetch(id)
                .await?
                .map(|Wrapper(room, version)| Reserved::new(room, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Room>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_ALL))
    }

    fn contains_by_id(
        &self,
        id: &RoomId,
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

impl RoomRepository for SqliteRoomRepository {
    fn find_by_house_id(
        &self,
        house_id: &HouseId,
    ) -> impl Future<Output = Result<Vec<Room>, SmartHomeError>> + Send {
        self.fetch_all(sqlx::query(SELECT_BY_HOUSE).bind(house_id.to_string()))
    }
}
