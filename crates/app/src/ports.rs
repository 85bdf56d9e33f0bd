//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod capabilities;
pub mod storage;

pub use capabilities::{CapabilitySource, GeneralSettings};
pub use storage::{
    ActuatorRepository, DeviceRepository, HouseRepository, InstantValueRepository, Repository,
    Reserved, RoomRepository, SensorRepository, Storage, ValueRepository,
};
