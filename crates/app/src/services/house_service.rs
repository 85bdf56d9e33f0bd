//! House service — use-cases for houses and their location.

use smarthome_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smarthome_domain::house::House;
use smarthome_domain::id::HouseId;
use smarthome_domain::location::Location;

use crate::ports::HouseRepository;

/// Application service for houses.
pub struct HouseService<R> {
    repo: R,
}

impl<R: HouseRepository> HouseService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Store a new house.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Conflict`] when the id is taken, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, house), fields(house_id = %house.id))]
    pub async fn create_house(&self, house: House) -> Result<House, SmartHomeError> {
        house.validate()?;
        let id = house.id.to_string();
        self.repo.save(house).await?.ok_or_else(|| {
            ConflictError::AlreadyExists {
                entity: "House",
                id,
            }
            .into()
        })
    }

    /// Look up a house by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] when no house with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_house(&self, id: &HouseId) -> Result<House, SmartHomeError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "House",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all houses.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_houses(&self) -> Result<Vec<House>, SmartHomeError> {
        self.repo.find_all().await
    }

    /// Set the address and coordinates of a house.
    ///
    /// The house is reserved on read so the write needs no second lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown house, or
    /// [`ConflictError::StaleReservation`] when it changed in between.
    #[tracing::instrument(skip(self, location))]
    pub async fn configure_location(
        &self,
        id: &HouseId,
        location: Location,
    ) -> Result<House, SmartHomeError> {
        let reservation = self.repo.find_by_id_and_reserve(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "House",
                id: id.to_string(),
            }
        })?;

        let mut house = reservation.entity().clone();
        house.configure_location(location);
        house.validate()?;

        self.repo
            .update_reserved(reservation, house)
            .await?
            .ok_or_else(|| {
                ConflictError::StaleReservation {
                    entity: "House",
                    id: id.to_string(),
                }
                .into()
            })
    }
}
