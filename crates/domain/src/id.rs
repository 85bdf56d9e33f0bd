//! Typed identifier newtypes backed by non-blank strings.
//!
//! Identifiers are opaque and case-sensitive. They are chosen by the user
//! (`"Room001"`, `"TemperatureCelsius"`) except for houses and values, which
//! fall back to a random UUID when none is supplied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $label:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier after checking it is not blank.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::Blank`] for empty or whitespace-only input.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::Blank($label));
                }
                Ok(Self(value))
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`House`](crate::house::House).
    HouseId,
    "house id"
);

define_id!(
    /// Unique identifier for a [`Room`](crate::room::Room).
    RoomId,
    "room id"
);

define_id!(
    /// Unique identifier for a [`Device`](crate::device::Device).
    DeviceId,
    "device id"
);

define_id!(
    /// Unique identifier for a [`Sensor`](crate::sensor::Sensor).
    SensorId,
    "sensor id"
);

define_id!(
    /// Unique identifier for an [`Actuator`](crate::actuator::Actuator).
    ActuatorId,
    "actuator id"
);

define_id!(
    /// Unique identifier for a recorded value.
    ValueId,
    "value id"
);

define_id!(
    /// Name of a sensor capability, e.g. `TemperatureCelsius`.
    SensorFunctionalityId,
    "sensor functionality id"
);

define_id!(
    /// Name of an actuator capability, e.g. `Switch`.
    ActuatorFunctionalityId,
    "actuator functionality id"
);

impl HouseId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ValueId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
