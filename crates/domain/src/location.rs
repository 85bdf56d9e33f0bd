//! Geographic value objects: GPS coordinates, postal address, house location.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGpsCode")]
pub struct GpsCode {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGpsCode {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGpsCode> for GpsCode {
    type Error = ValidationError;

    fn try_from(raw: RawGpsCode) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl GpsCode {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when latitude is outside `[-90, 90]` or
    /// longitude outside `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GpsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Postal address. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub door_number: String,
    pub zip_code: String,
    pub city: String,
    pub country: String,
}

impl Address {
    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] naming the first blank field.
    pub fn new(
        street: impl Into<String>,
        door_number: impl Into<String>,
        zip_code: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let address = Self {
            street: street.into(),
            door_number: door_number.into(),
            zip_code: zip_code.into(),
            city: city.into(),
            country: country.into(),
        };
        address.validate()?;
        Ok(address)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] naming the first blank field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            (&self.street, "street"),
            (&self.door_number, "door number"),
            (&self.zip_code, "zip code"),
            (&self.city, "city"),
            (&self.country, "country"),
        ];
        for (value, name) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::Blank(name));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.street, self.door_number, self.zip_code, self.city, self.country
        )
    }
}

/// Where a house stands: its address and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: Address,
    pub gps_code: GpsCode,
}

impl Location {
    #[must_use]
    pub fn new(address: Address, gps_code: GpsCode) -> Self {
        Self { address, gps_code }
    }
}
