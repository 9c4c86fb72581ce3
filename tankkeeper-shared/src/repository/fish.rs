//! Fish repository

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{Fish, FishFields};
use crate::store::DataStore;

pub struct FishRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> FishRepository<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> CoreResult<Vec<Fish>> {
        let mut session = self.store.begin().await?;
        Ok(session.list_fish().await?)
    }

    pub async fn get_one(&self, id: Uuid) -> CoreResult<Fish> {
        let mut session = self.store.begin().await?;
        session
            .find_fish(id)
            .await?
            .ok_or_else(|| CoreError::not_found("fish", id))
    }

    /// Creates an unassociated fish under a fresh ID
    pub async fn create(&self, fields: FishFields) -> CoreResult<Fish> {
        let mut session = self.store.begin().await?;
        let fish = session
            .insert_fish(&fields.into_new(Uuid::new_v4(), None))
            .await?;
        session.commit().await?;

        info!(fish_id = %fish.id, "Created fish");
        Ok(fish)
    }

    /// Replaces the descriptive fields; the tank association is unchanged
    pub async fn update(&self, id: Uuid, fields: FishFields) -> CoreResult<Fish> {
        let mut session = self.store.begin().await?;
        let fish = session
            .update_fish(id, &fields.into_changes())
            .await?
            .ok_or_else(|| CoreError::not_found("fish", id))?;
        session.commit().await?;

        debug!(fish_id = %id, "Updated fish");
        Ok(fish)
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<Fish> {
        let mut session = self.store.begin().await?;
        let fish = session
            .delete_fish(id)
            .await?
            .ok_or_else(|| CoreError::not_found("fish", id))?;
        session.commit().await?;

        info!(fish_id = %id, "Deleted fish");
        Ok(fish)
    }

    /// Fish in a tank; empty, not `NotFound`, when the tank is missing
    pub async fn get_by_tank(&self, tank_id: Uuid) -> CoreResult<Vec<Fish>> {
        let mut session = self.store.begin().await?;
        Ok(session.list_fish_by_tank(tank_id).await?)
    }
}
