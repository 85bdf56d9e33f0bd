//! Room service — use-cases for the rooms of a house.

use smarthome_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::id::{HouseId, RoomId};
use smarthome_domain::room::{Room, RoomDimensions};

use crate::ports::{HouseRepository, RoomRepository};

/// Application service for rooms.
pub struct RoomService<R, H> {
    repo: R,
    houses: H,
}

impl<R: RoomRepository, H: HouseRepository> RoomService<R, H> {
    /// Create a new service backed by the given repositories.
    pub fn new(repo: R, houses: H) -> Self {
        Self { repo, houses }
    }

    /// Add a room to an existing house.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown house,
    /// [`SmartHomeError::Conflict`] when the room id is taken, or a storage
    /// error from the repositories.
    #[tracing::instrument(skip(self, room), fields(room_id = %room.id, house_id = %room.house_id))]
    pub async fn create_room(&self, room: Room) -> Result<Room, SmartHomeError> {
        room.validate()?;
        if !self.houses.contains_by_id(&room.house_id).await? {
            return Err(NotFoundError {
                entity: "House",
                id: room.house_id.to_string(),
            }
            .into());
        }
        let id = room.id.to_string();
        self.repo.save(room).await?.ok_or_else(|| {
            ConflictError::AlreadyExists { entity: "Room", id }.into()
        })
    }

    /// Look up a room by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no room with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_room(&self, id: &RoomId) -> Result<Room, SmartHomeError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Room",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List the rooms of a house.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown house.
    #[tracing::instrument(skip(self))]
    pub async fn list_rooms_in_house(&self, house_id: &HouseId) -> Result<Vec<Room>, SmartHomeError> {
        self.ensure_house(house_id).await?;
        self.repo.find_by_house_id(house_id).await
    }

    /// List the indoor (`indoor = true`) or outdoor rooms of a house.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown house.
    #[tracing::instrument(skip(self))]
    pub async fn list_rooms_by_placement(
        &self,
        house_id: &HouseId,
        indoor: bool,
    ) -> Result<Vec<Room>, SmartHomeError> {
        let rooms = self.list_rooms_in_house(house_id).await?;
        Ok(rooms
            .into_iter()
            .filter(|room| room.is_outdoor() != indoor)
            .collect())
    }

    /// Change the floor and dimensions of a room.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown room, or
    /// [`ConflictError::StaleReservation`] when it changed in between.
    #[tracing::instrument(skip(self))]
    pub async fn edit_room(
        &self,
        id: &RoomId,
        floor: i32,
        dimensions: RoomDimensions,
    ) -> Result<Room, SmartHomeError> {
        dimensions.validate()?;
        let reservation = self.repo.find_by_id_and_reserve(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Room",
                id: id.to_string(),
            }
        })?;

        let mut room = reservation.entity().clone();
        room.edit(floor, dimensions);

        self.repo
            .update_reserved(reservation, room)
            .await?
            .ok_or_else(|| {
                ConflictError::StaleReservation {
                    entity: "Room",
                    id: id.to_string(),
                }
                .into()
            })
    }

    async fn ensure_house(&self, house_id: &HouseId) -> Result<(), SmartHomeError> {
        if self.houses.contains_by_id(house_id).await? {
            Ok(())
        } else {
            Err(NotFoundError {
                entity: "House",
                id: house_id.to_string(),
            }
            .into())
        }
    }
}
