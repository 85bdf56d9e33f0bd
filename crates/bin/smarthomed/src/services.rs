//! Application services wired over one storage backend.

use smarthome_app::capabilities::Capabilities;
use smarthome_app::ports::Storage;
use smarthome_app::services::actuator_service::ActuatorService;
use smarthome_app::services::device_service::DeviceService;
use smarthome_app::services::functionality_service::FunctionalityService;
use smarthome_app::services::house_service::HouseService;
use smarthome_app::services::room_service::RoomService;
use smarthome_app::services::sensor_service::SensorService;
use smarthome_app::services::value_service::ValueService;

pub struct Services<S: Storage> {
    pub houses: HouseService<S::Houses>,
    pub rooms: RoomService<S::Rooms, S::Houses>,
    pub devices: DeviceService<S::Devices, S::Rooms, S::Sensors, S::Actuators>,
    pub sensors: SensorService<S::Sensors, S::Devices>,
    pub actuators: ActuatorService<S::Actuators, S::Devices>,
    pub functionalities: FunctionalityService,
    pub values: ValueService<S::Sensors, S::InstantValues, S::InstantLocationValues, S::PeriodValues>,
}

impl<S: Storage> Services<S> {
    pub fn new(storage: &S, capabilities: &Capabilities) -> Self {
        Self {
            houses: HouseService::new(storage.houses()),
            rooms: RoomService::new(storage.rooms(), storage.houses()),
            devices: DeviceService::new(
                storage.devices(),
                storage.rooms(),
                storage.sensors(),
                storage.actuators(),
            ),
            sensors: SensorService::new(storage.sensors(), storage.devices(), capabilities.clone()),
            actuators: ActuatorService::new(
                storage.actuators(),
                storage.devices(),
                capabilities.clone(),
            ),
            functionalities: FunctionalityService::new(capabilities.clone()),
            values: ValueService::new(
                storage.sensors(),
                storage.instant_values(),
                storage.instant_location_values(),
                storage.period_values(),
                capabilities.clone(),
            ),
        }
    }
}
