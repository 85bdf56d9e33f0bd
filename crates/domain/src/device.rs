//! Device — a physical appliance placed in a room that carries sensors and actuators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::{SmartHomeError, ValidationError};
use crate::id::{DeviceId, RoomId};

/// Whether a device still takes part in the house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Active,
    Deactivated,
}

impl DeviceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`DeviceStatus`] label.
#[derive(Debug, thiserror::Error)]
#[error("unknown device status `{0}`")]
pub struct UnknownDeviceStatus(pub String);

impl FromStr for DeviceStatus {
    type Err = UnknownDeviceStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "deactivated" => Ok(Self::Deactivated),
            other => Err(UnknownDeviceStatus(other.to_string())),
        }
    }
}

/// An appliance in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub room_id: RoomId,
    pub model: String,
    pub status: DeviceStatus,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when `model` is blank.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if self.model.trim().is_empty() {
            return Err(ValidationError::Blank("device model").into());
        }
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }

    /// Take the device out of service.
    ///
    /// Returns `false` when the device was already deactivated.
    pub fn deactivate(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = DeviceStatus::Deactivated;
        true
    }
}

impl AggregateRoot for Device {
    type Id = DeviceId;

    const KIND: &'static str = "Device";

    fn identity(&self) -> &DeviceId {
        &self.id
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    room_id: Option<RoomId>,
    model: Option<String>,
    status: DeviceStatus,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn room_id(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if the id or room are missing,
    /// or the model is blank.
    pub fn build(self) -> Result<Device, SmartHomeError> {
        let device = Device {
            id: self.id.ok_or(ValidationError::Missing("device id"))?,
            room_id: self.room_id.ok_or(ValidationError::Missing("room id"))?,
            model: self.model.unwrap_or_default(),
            status: self.status,
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kettle() -> Device {
        Device::builder()
            .id(DeviceId::new("Device001").unwrap())
            .room_id(RoomId::new("Room001").unwrap())
            .model("Kettle 3000")
            .build()
            .unwrap()
    }

    #[test]
    fn should_start_active_when_built() {
        let device = kettle();
        assert!(device.is_active());
        assert_eq!(device.status, DeviceStatus::Active);
    }

    #[test]
    fn should_return_validation_error_when_model_is_blank() {
        let result = Device::builder()
            .id(DeviceId::new("Device001").unwrap())
            .room_id(RoomId::new("Room001").unwrap())
            .model(" ")
            .build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::Blank("device model")))
        ));
    }

    #[test]
    fn should_deactivate_only_once() {
        let mut device = kettle();
        assert!(device.deactivate());
        assert!(!device.is_active());
        assert!(!device.deactivate());
    }

    #[test]
    fn should_parse_status_labels() {
        assert_eq!(
            "deactivated".parse::<DeviceStatus>().unwrap(),
            DeviceStatus::Deactivated
        );
        assert!("broken".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let device = kettle();
        let json = serde_json::to_string(&device).unwrap();
        let parsed: Device = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_same_as(&device));
        assert_eq!(parsed.model, "Kettle 3000");
    }
}
