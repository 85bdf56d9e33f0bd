//! Actuator service — attaching actuators to devices and commanding them.

use smarthome_domain::actuator::{ActuatorBlueprint, ActuatorProperties, ActuatorRef};
use smarthome_domain::error::{CapabilityError, ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::id::{ActuatorFunctionalityId, ActuatorId, DeviceId};

use crate::capabilities::{construction_error, Capabilities};
use crate::ports::{ActuatorRepository, DeviceRepository};
use crate::services::device_service::require_active_device;

/// Application service for actuators.
pub struct ActuatorService<A, D> {
    repo: A,
    devices: D,
    capabilities: Capabilities,
}

impl<A: ActuatorRepository, D: DeviceRepository> ActuatorService<A, D> {
    pub fn new(repo: A, devices: D, capabilities: Capabilities) -> Self {
        Self {
            repo,
            devices,
            capabilities,
        }
    }

    /// Build an actuator for `functionality_id` and attach it to a device.
    ///
    /// # Errors
    ///
    /// Same failures as sensor creation, plus [`SmartHomeError::Validation`]
    /// when the implementation refuses `properties`.
    #[tracing::instrument(skip(self))]
    pub async fn add_actuator(
        &self,
        id: ActuatorId,
        device_id: DeviceId,
        functionality_id: ActuatorFunctionalityId,
        properties: ActuatorProperties,
    ) -> Result<ActuatorRef, SmartHomeError> {
        require_active_device(&self.devices, &device_id).await?;

        let registry = &self.capabilities.actuators;
        if !registry.contains(&functionality_id) {
            return Err(CapabilityError::NotListed(functionality_id.to_string()).into());
        }
        let actuator = self
            .capabilities
            .actuator_factory
            .try_create(
                registry.implementation_name_for(&functionality_id),
                ActuatorBlueprint {
                    id,
                    functionality_id: functionality_id.clone(),
                    properties,
                    device_id,
                },
            )
            .map_err(|err| construction_error(functionality_id.as_str(), err))?;

        let actuator_id = actuator.id().to_string();
        let saved = self
            .repo
            .save(actuator)
            .await?
            .ok_or(ConflictError::AlreadyExists {
                entity: "Actuator",
                id: actuator_id,
            })?;
        tracing::info!(kind = saved.kind(), "actuator added");
        Ok(saved)
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no actuator with `id` exists.
    pub async fn get_actuator(&self, id: &ActuatorId) -> Result<ActuatorRef, SmartHomeError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Actuator",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown device.
    #[tracing::instrument(skip(self))]
    pub async fn list_actuators_of_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Vec<ActuatorRef>, SmartHomeError> {
        if !self.devices.contains_by_id(device_id).await? {
            return Err(NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into());
        }
        self.repo.find_by_device_id(device_id).await
    }

    /// Validate a command for an actuator and return the value to send.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown actuator,
    /// [`ConflictError::DeviceInactive`] when its device is deactivated, or
    /// [`SmartHomeError::Validation`] when the value is out of range.
    #[tracing::instrument(skip(self))]
    pub async fn set_value(&self, id: &ActuatorId, value: f64) -> Result<f64, SmartHomeError> {
        let actuator = self.get_actuator(id).await?;
        require_active_device(&self.devices, actuator.device_id()).await?;
        let effective = actuator.set_value(value)?;
        tracing::debug!(effective, "actuator command accepted");
        Ok(effective)
    }
}
