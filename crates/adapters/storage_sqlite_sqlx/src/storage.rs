//! [`Storage`] backend handing out `SQLite` repositories over one pool.

use sqlx::SqlitePool;

use smarthome_app::capabilities::Capabilities;
use smarthome_app::ports::Storage;
use smarthome_domain::value::{InstantLocationValue, InstantValue, PeriodValue};

use crate::{
    SqliteActuatorRepository, SqliteDeviceRepository, SqliteHouseRepository,
    SqliteRoomRepository, SqliteSensorRepository, SqliteValueRepository,
};

/// Every repository shares the pool; sensors and actuators also need the
/// capabilities to rebuild their implementations from stored rows.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    capabilities: Capabilities,
}

impl SqliteStorage {
    #[must_use]
    pub fn new(pool: SqlitePool, capabilities: Capabilities) -> Self {
        Self { pool, capabilities }
    }
}

impl Storage for SqliteStorage {
    type Houses = SqliteHouseRepository;
    type Rooms = SqliteRoomRepository;
    type Devices = SqliteDeviceRepository;
    type Sensors = SqliteSensorRepository;
    type Actuators = SqliteActuatorRepository;
    type InstantValues = SqliteValueRepository<InstantValue>;
    type InstantLocationValues = SqliteValueRepository<InstantLocationValue>;
    type PeriodValues = SqliteValueRepository<PeriodValue>;

    fn houses(&self) -> Self::Houses {
        SqliteHouseRepository::new(self.pool.clone())
    }

    fn rooms(&self) -> Self::Rooms {
        SqliteRoomRepository::new(self.pool.clone())
    }

    fn devices(&self) -> Self::Devices {
        SqliteDeviceRepository::new(self.pool.clone())
    }

    fn sensors(&self) -> Self::Sensors {
        SqliteSensorRepository::new(self.pool.clone(), self.capabilities.clone())
    }

    fn actuators(&self) -> Self::Actuators {
        SqliteActuatorRepository::new(self.pool.clone(), self.capabilities.clone())
    }

    fn instant_values(&self) -> Self::InstantValues {
        SqliteValueRepository::new(self.pool.clone())
    }

    fn instant_location_values(&self) -> Self::InstantLocationValues {
        SqliteValueRepository::new(self.pool.clone())
    }

    fn period_values(&self) -> Self::PeriodValues {
        SqliteValueRepository::new(self.pool.clone())
    }
}
