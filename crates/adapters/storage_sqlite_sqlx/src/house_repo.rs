//! `SQLite` implementation of [`HouseRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::{HouseRepository, Repository, Reserved};
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::house::House;
use smarthome_domain::id::HouseId;
use smarthome_domain::location::{Address, GpsCode, Location};

use crate::codec::{SqliteQuery, decode_error, decode_version, encode_version, execute};
use crate::error::StorageError;

/// Wrapper for converting database rows into a domain [`House`] and its
/// stored version.
struct Wrapper(House, u64);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let street: Option<String> = row.try_get("street")?;
        let door_number: Option<String> = row.try_get("door_number")?;
        let zip_code: Option<String> = row.try_get("zip_code")?;
        let city: Option<String> = row.try_get("city")?;
        let country: Option<String> = row.try_get("country")?;
        let latitude: Option<f64> = row.try_get("latitude")?;
        let longitude: Option<f64> = row.try_get("longitude")?;
        let version: i64 = row.try_get("version")?;

        let id = HouseId::from_str(&id).map_err(decode_error)?;
        let location = match (street, door_number, zip_code, city, country, latitude, longitude) {
            (
                Some(street),
                Some(door_number),
                Some(zip_code),
                Some(city),
                Some(country),
                Some(latitude),
                Some(longitude),
            ) => Some(Location {
                address: Address {
                    street,
                    door_number,
                    zip_code,
                    city,
                    country,
                },
                gps_code: GpsCode::new(latitude, longitude).map_err(decode_error)?,
            }),
            _ => None,
        };

        Ok(Self(House { id, location }, decode_version(version)?))
    }
}

const INSERT: &str = r"
    INSERT INTO houses (street, door_number, zip_code, city, country, latitude, longitude, id)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO NOTHING
";
const UPDATE: &str = r"
    UPDATE houses
    SET street = ?, door_number = ?, zip_code = ?, city = ?, country = ?,
        latitude = ?, longitude = ?, version = version + 1
    WHERE id = ?
";
const UPDATE_RESERVED: &str = r"
    UPDATE houses
    SET street = ?, door_number = ?, zip_code = ?, city = ?, country = ?,
        latitude = ?, longitude = ?, version = version + 1
    WHERE id = ? AND version = ?
";
const SELECT_BY_ID: &str = "SELECT * FROM houses WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM houses ORDER BY id";
const EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM houses WHERE id = ?)";

/// Binds every column in statement order, the id last.
fn bind_house<'q>(query: SqliteQuery<'q>, house: &House) -> SqliteQuery<'q> {
    let location = house.location.as_ref();
    query
        .bind(location.map(|l| l.address.street.clone()))
        .bind(location.map(|l| l.address.door_number.clone()))
        .bind(location.map(|l| l.address.zip_code.clone()))
        .bind(location.map(|l| l.address.city.clone()))
        .bind(location.map(|l| l.address.country.clone()))
        .bind(location.map(|l| l.gps_code.latitude()))
        .bind(location.map(|l| l.gps_code.longitude()))
        .bind(house.id.to_string())
}

/// `SQLite`-backed house repository.
#[derive(Clone)]
pub struct SqliteHouseRepository {
    pool: SqlitePool,
}

impl SqliteHouseRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &HouseId) -> Result<Option<Wrapper>, SmartHomeError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row)
    }
}

impl Repository<House> for SqliteHouseRepository {
    fn save(&self, house: House) -> impl Future<Output = Result<Option<House>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let inserted = execute(&pool, bind_house(sqlx::query(INSERT), &house)).await?;
            Ok(inserted.then_some(house))
        }
    }

    fn update(&self, house: House) -> impl Future<Output = Result<Option<House>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let updated = execute(&pool, bind_house(sqlx::query(UPDATE), &house)).await?;
            Ok(updated.then_some(house))
        }
    }

    fn update_reserved(
        &self,
        reservation: Reserved<House>,
        house: House,
    ) -> impl Future<Output = Result<Option<House>, SmartHomeError>> + Send {
        let pool = self.pool.clone();
        async move {
            if !reservation.matches(&house) {
                return Ok(None);
            }
            let query = bind_house(sqlx::query(UPDATE_RESERVED), &house)
                .bind(encode_version(reservation.version()));
            let updated = execute(&pool, query).await?;
            Ok(updated.then_some(house))
        }
    }

    fn find_by_id(
        &self,
        id: &HouseId,
    ) -> impl Future<Output = Result<Option<House>, SmartHomeError>> + Send {
        async move { Ok(self.fetch(id).await?.map(|row| row.0)) }
    }

    fn find_by_id_and_reserve(
        &self,
        id: &HouseId,
    ) -> impl Future<Output = Result<Option<Reserved<House>>, SmartHomeError>> + Send {
        async move {
            Ok(self
                .fetch(id)
                .await?
                .map(|Wrapper(house, version)| Reserved::new(house, version)))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<House>, SmartHomeError>> + Send {
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
        id: &HouseId,
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

impl HouseRepository for SqliteHouseRepository {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteHouseRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteHouseRepository::new(db.pool().clone())
    }

    fn porto() -> Location {
        Location::new(
            Address::new("Rua Dr. Bernardino", "431", "4200-072", "Porto", "Portugal").unwrap(),
            GpsCode::new(41.178, -8.608).unwrap(),
        )
    }

    fn house(id: &str) -> House {
        House::builder().id(HouseId::new(id).unwrap()).build().unwrap()
    }

    #[tokio::test]
    async fn should_save_and_find_house_without_location() {
        let repo = setup().await;
        repo.save(house("House001")).await.unwrap().unwrap();

        let fetched = repo
            .find_by_id(&HouseId::new("House001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.location.is_none());
    }

    #[tokio::test]
    async fn should_return_none_when_saving_existing_id() {
        let repo = setup().await;
        repo.save(house("House001")).await.unwrap();
        assert!(repo.save(house("House001")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_preserve_location_through_roundtrip() {
        let repo = setup().await;
        let mut with_location = house("House001");
        with_location.configure_location(porto());
        repo.save(with_location).await.unwrap();

        let fetched = repo
            .find_by_id(&HouseId::new("House001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.location, Some(porto()));
    }

    #[tokio::test]
    async fn should_refuse_stale_reservation() {
        let repo = setup().await;
        repo.save(house("House001")).await.unwrap();
        let id = HouseId::new("House001").unwrap();

        let stale = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();
        let fresh = repo.find_by_id_and_reserve(&id).await.unwrap().unwrap();

        let mut edited = fresh.entity().clone();
        edited.configure_location(porto());
        assert!(repo.update_reserved(fresh, edited.clone()).await.unwrap().is_some());
        assert!(repo.update_reserved(stale, edited).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_report_existence_by_id() {
        let repo = setup().await;
        repo.save(house("House001")).await.unwrap();

        assert!(repo.contains_by_id(&HouseId::new("House001").unwrap()).await.unwrap());
        assert!(!repo.contains_by_id(&HouseId::new("House002").unwrap()).await.unwrap());
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
