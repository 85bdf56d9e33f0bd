//! Device service — use-cases for managing devices.

use std::collections::BTreeMap;

use smarthome_domain::device::Device;
use smarthome_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::id::{ActuatorFunctionalityId, DeviceId, HouseId, RoomId, SensorFunctionalityId};

use crate::ports::{ActuatorRepository, DeviceRepository, RoomRepository, SensorRepository};

/// Devices of a house grouped by the functionalities they provide.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DevicesByFunctionality {
    pub sensors: BTreeMap<SensorFunctionalityId, Vec<DeviceId>>,
    pub actuators: BTreeMap<ActuatorFunctionalityId, Vec<DeviceId>>,
}

/// Application service for device operations.
pub struct DeviceService<D, R, S, A> {
    repo: D,
    rooms: R,
    sensors: S,
    actuators: A,
}

impl<D, R, S, A> DeviceService<D, R, S, A>
where
    D: DeviceRepository,
    R: RoomRepository,
    S: SensorRepository,
    A: ActuatorRepository,
{
    /// Create a new service backed by the given repositories.
    pub fn new(repo: D, rooms: R, sensors: S, actuators: A) -> Self {
        Self {
            repo,
            rooms,
            sensors,
            actuators,
        }
    }

    /// Place a new device in an existing room.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::NotFound`] for an unknown room, or
    /// [`SmartHomeError::Conflict`] when the id is taken.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id, room_id = %device.room_id))]
    pub async fn create_device(&self, device: Device) -> Result<Device, SmartHomeError> {
        device.validate()?;
        self.ensure_room(&device.room_id).await?;
        let id = device.id.to_string();
        self.repo.save(device).await?.ok_or_else(|| {
            ConflictError::AlreadyExists {
                entity: "Device",
                id,
            }
            .into()
        })
    }

    /// Look up a device by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no device with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_device(&self, id: &DeviceId) -> Result<Device, SmartHomeError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Take a device out of service.
    ///
    /// Returns `false` when the device was already deactivated; nothing is
    /// written in that case.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device, or
    /// [`ConflictError::StaleReservation`] when it changed in between.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_device(&self, id: &DeviceId) -> Result<bool, SmartHomeError> {
        let reservation = self.repo.find_by_id_and_reserve(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
        })?;

        let mut device = reservation.entity().clone();
        if !device.deactivate() {
            tracing::debug!("device already deactivated");
            return Ok(false);
        }

        match self.repo.update_reserved(reservation, device).await? {
            Some(_) => Ok(true),
            None => Err(ConflictError::StaleReservation {
                entity: "Device",
                id: id.to_string(),
            }
            .into()),
        }
    }

    /// List the devices of a room.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown room.
    #[tracing::instrument(skip(self))]
    pub async fn list_devices_in_room(&self, room_id: &RoomId) -> Result<Vec<Device>, SmartHomeError> {
        self.ensure_room(room_id).await?;
        self.repo.find_by_room_id(room_id).await
    }

    /// List the devices of every room of a house.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn list_devices_in_house(
        &self,
        house_id: &HouseId,
    ) -> Result<Vec<Device>, SmartHomeError> {
        let mut devices = Vec::new();
        for room in self.rooms.find_by_house_id(house_id).await? {
            devices.extend(self.repo.find_by_room_id(&room.id).await?);
        }
        Ok(devices)
    }

    /// Group the devices of a house by the functionalities of their sensors
    /// and actuators. A device appears once per functionality.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn devices_by_functionality(
        &self,
        house_id: &HouseId,
    ) -> Result<DevicesByFunctionality, SmartHomeError> {
        let mut grouped = DevicesByFunctionality::default();
        for device in self.list_devices_in_house(house_id).await? {
            for sensor in self.sensors.find_by_device_id(&device.id).await? {
                push_unique(
                    grouped
                        .sensors
                        .entry(sensor.functionality_id().clone())
                        .or_default(),
                    &device.id,
                );
            }
            for actuator in self.actuators.find_by_device_id(&device.id).await? {
                push_unique(
                    grouped
                        .actuators
                        .entry(actuator.functionality_id().clone())
                        .or_default(),
                    &device.id,
                );
            }
        }
        Ok(grouped)
    }

    async fn ensure_room(&self, room_id: &RoomId) -> Result<(), SmartHomeError> {
        if self.rooms.contains_by_id(room_id).await? {
            Ok(())
        } else {
            Err(NotFoundError {
                entity: "Room",
                id: room_id.to_string(),
            }
            .into())
        }
    }
}

/// Fetch a device that must exist and be active before something is attached
/// to it.
pub(crate) async fn require_active_device<D: DeviceRepository>(
    devices: &D,
    id: &DeviceId,
) -> Result<Device, SmartHomeError> {
    let device = devices.find_by_id(id).await?.ok_or_else(|| NotFoundError {
        entity: "Device",
        id: id.to_string(),
    })?;
    if device.is_active() {
        Ok(device)
    } else {
        Err(ConflictError::DeviceInactive(id.to_string()).into())
    }
}

fn push_unique(devices: &mut Vec<DeviceId>, id: &DeviceId) {
    if !devices.contains(id) {
        devices.push(id.clone());
    }
}
