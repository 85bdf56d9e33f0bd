//! House — the root of the spatial hierarchy, optionally located on a map.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::SmartHomeError;
use crate::id::HouseId;
use crate::location::Location;

/// A house containing rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub location: Option<Location>,
}

impl House {
    /// Create a builder for constructing a [`House`].
    #[must_use]
    pub fn builder() -> HouseBuilder {
        HouseBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when the address has a blank field.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        if let Some(location) = &self.location {
            location.address.validate()?;
        }
        Ok(())
    }

    /// Replace the location and return the new one.
    pub fn configure_location(&mut self, location: Location) -> &Location {
        self.location.insert(location)
    }
}

impl AggregateRoot for House {
    type Id = HouseId;

    const KIND: &'static str = "House";

    fn identity(&self) -> &HouseId {
        &self.id
    }
}

/// Step-by-step builder for [`House`].
#[derive(Debug, Default)]
pub struct HouseBuilder {
    id: Option<HouseId>,
    location: Option<Location>,
}

impl HouseBuilder {
    #[must_use]
    pub fn id(mut self, id: HouseId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Consume the builder, validate, and return a [`House`].
    ///
    /// A random id is generated when none was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if the location is invalid.
    pub fn build(self) -> Result<House, SmartHomeError> {
        let house = House {
            id: self.id.unwrap_or_else(HouseId::generate),
            location: self.location,
        };
        house.validate()?;
        Ok(house)
    }
}
