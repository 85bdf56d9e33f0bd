//! # smarthome-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `smarthome-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows, keeping a version column
//!   per row so reservations can detect concurrent writes
//!
//! Sensors and actuators are stored as plain rows and rebuilt through the
//! capability registry and factories when read back.
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for port traits) and `smarthome-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod actuator_repo;
mod codec;
mod device_repo;
pub mod error;
mod house_repo;
pub mod pool;
mod room_repo;
mod sensor_repo;
mod storage;
mod value_repo;

pub use actuator_repo::SqliteActuatorRepository;
pub use device_repo::SqliteDeviceRepository;
pub use house_repo::SqliteHouseRepository;
pub use room_repo::SqliteRoomRepository;
pub use sensor_repo::SqliteSensorRepository;
pub use storage::SqliteStorage;
pub use value_repo::{InstantValueTable, SqliteValueRepository, ValueTable};
