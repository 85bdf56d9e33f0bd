//! Room — a space inside (or, with zero height, outside) a house.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::{SmartHomeError, ValidationError};
use crate::id::{HouseId, RoomId};

/// Length, width and height in metres.
///
/// A height of zero marks an outdoor area such as a garden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomDimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl RoomDimensions {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if length or width are not strictly
    /// positive, or height is negative.
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        let dimensions = Self {
            length,
            width,
            height,
        };
        dimensions.validate()?;
        Ok(dimensions)
    }

    /// # Errors
    ///
    /// See [`RoomDimensions::new`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.length.is_nan() || self.length <= 0.0 {
            return Err(ValidationError::NonPositiveDimension("length"));
        }
        if self.width.is_nan() || self.width <= 0.0 {
            return Err(ValidationError::NonPositiveDimension("width"));
        }
        if self.height.is_nan() || self.height < 0.0 {
            return Err(ValidationError::NegativeHeight);
        }
        Ok(())
    }
}

/// A room of a house.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub house_id: HouseId,
    pub floor: i32,
    pub dimensions: RoomDimensions,
}

impl Room {
    /// Create a builder for constructing a [`Room`].
    #[must_use]
    pub fn builder() -> RoomBuilder {
        RoomBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] when the dimensions are invalid.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        self.dimensions.validate()?;
        Ok(())
    }

    /// Move the room to another floor and resize it.
    pub fn edit(&mut self, floor: i32, dimensions: RoomDimensions) {
        self.floor = floor;
        self.dimensions = dimensions;
    }

    /// Outdoor areas are modelled as rooms without height.
    #[must_use]
    pub fn is_outdoor(&self) -> bool {
        self.dimensions.height <= 0.0
    }
}

impl AggregateRoot for Room {
    type Id = RoomId;

    const KIND: &'static str = "Room";

    fn identity(&self) -> &RoomId {
        &self.id
    }
}

/// Step-by-step builder for [`Room`].
#[derive(Debug, Default)]
pub struct RoomBuilder {
    id: Option<RoomId>,
    house_id: Option<HouseId>,
    floor: i32,
    dimensions: Option<RoomDimensions>,
}

impl RoomBuilder {
    #[must_use]
    pub fn id(mut self, id: RoomId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn house_id(mut self, house_id: HouseId) -> Self {
        self.house_id = Some(house_id);
        self
    }

    #[must_use]
    pub fn floor(mut self, floor: i32) -> Self {
        self.floor = floor;
        self
    }

    #[must_use]
    pub fn dimensions(mut self, dimensions: RoomDimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Consume the builder, validate, and return a [`Room`].
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if the id, house or dimensions
    /// are missing or invalid.
    pub fn build(self) -> Result<Room, SmartHomeError> {
        let room = Room {
            id: self.id.ok_or(ValidationError::Missing("room id"))?,
            house_id: self.house_id.ok_or(ValidationError::Missing("house id"))?,
            floor: self.floor,
            dimensions: self
                .dimensions
                .ok_or(ValidationError::Missing("room dimensions"))?,
        };
        room.validate()?;
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bedroom() -> Room {
        Room::builder()
            .id(RoomId::new("Room001").unwrap())
            .house_id(HouseId::new("House001").unwrap())
            .floor(1)
            .dimensions(RoomDimensions::new(4.0, 3.5, 2.7).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_room_when_all_fields_provided() {
        let room = bedroom();
        assert_eq!(room.floor, 1);
        assert!(!room.is_outdoor());
    }

    #[test]
    fn should_return_validation_error_when_house_missing() {
        let result = Room::builder()
            .id(RoomId::new("Room001").unwrap())
            .dimensions(RoomDimensions::new(1.0, 1.0, 1.0).unwrap())
            .build();
        assert!(matches!(
            result,
            Err(SmartHomeError::Validation(ValidationError::Missing("house id")))
        ));
    }

    #[test]
    fn should_reject_non_positive_length() {
        assert_eq!(
            RoomDimensions::new(0.0, 1.0, 1.0),
            Err(ValidationError::NonPositiveDimension("length"))
        );
    }

    #[test]
    fn should_reject_negative_height() {
        assert_eq!(
            RoomDimensions::new(1.0, 1.0, -0.1),
            Err(ValidationError::NegativeHeight)
        );
    }

    #[test]
    fn should_flag_room_as_outdoor_when_height_is_zero() {
        let mut room = bedroom();
        room.edit(0, RoomDimensions::new(10.0, 8.0, 0.0).unwrap());
        assert!(room.is_outdoor());
        assert_eq!(room.floor, 0);
    }
}
