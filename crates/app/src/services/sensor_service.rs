//! Sensor service — attaching sensors to devices.

use smarthome_domain::error::{CapabilityError, ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::id::{DeviceId, SensorFunctionalityId, SensorId};
use smarthome_domain::sensor::{SensorBlueprint, SensorRef};

use crate::capabilities::{construction_error, Capabilities};
use crate::ports::{DeviceRepository, SensorRepository};
use crate::services::device_service::require_active_device;

/// Application service for sensors.
pub struct SensorService<S, D> {
    repo: S,
    devices: D,
    capabilities: Capabilities,
}

impl<S: SensorRepository, D: DeviceRepository> SensorService<S, D> {
    pub fn new(repo: S, devices: D, capabilities: Capabilities) -> Self {
        Self {
            repo,
            devices,
            capabilities,
        }
    }

    /// Build a sensor for `functionality_id` and attach it to a device.
    ///
    /// The device must exist and be active, the functionality must be listed
    /// in the capability configuration and its implementation registered in
    /// the sensor factory.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device,
    /// [`ConflictError::DeviceInactive`] for a deactivated one,
    /// [`SmartHomeError::Capability`] when the functionality cannot be
    /// resolved, or [`ConflictError::AlreadyExists`] when the id is taken.
    #[tracing::instrument(skip(self))]
    pub async fn add_sensor(
        &self,
        id: SensorId,
        device_id: DeviceId,
        functionality_id: SensorFunctionalityId,
    ) -> Result<SensorRef, SmartHomeError> {
        require_active_device(&self.devices, &device_id).await?;

        let registry = &self.capabilities.sensors;
        if !registry.contains(&functionality_id) {
            return Err(CapabilityError::NotListed(functionality_id.to_string()).into());
        }
        let sensor = self
            .capabilities
            .sensor_factory
            .try_create(
                registry.implementation_name_for(&functionality_id),
                SensorBlueprint {
                    id,
                    functionality_id: functionality_id.clone(),
                    device_id,
                },
            )
            .map_err(|err| construction_error(functionality_id.as_str(), err))?;

        let sensor_id = sensor.id().to_string();
        let saved = self.repo.save(sensor).await?.ok_or(ConflictError::AlreadyExists {
            entity: "Sensor",
            id: sensor_id,
        })?;
        tracing::info!(kind = saved.kind(), "sensor added");
        Ok(saved)
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no sensor with `id` exists.
    pub async fn get_sensor(&self, id: &SensorId) -> Result<SensorRef, SmartHomeError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Sensor",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List the sensors attached to a device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device.
    #[tracing::instrument(skip(self))]
    pub async fn list_sensors_of_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Vec<SensorRef>, SmartHomeError> {
        if !self.devices.contains_by_id(device_id).await? {
            return Err(NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into());
        }
        self.repo.find_by_device_id(device_id).await
    }
}
