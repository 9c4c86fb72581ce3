//! Tank repository

use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{NewTank, Tank};
use crate::store::DataStore;

pub struct TankRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> TankRepository<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> CoreResult<Vec<Tank>> {
        let mut session = self.store.begin().await?;
        Ok(session.list_tanks().await?)
    }

    pub async fn get_one(&self, id: Uuid) -> CoreResult<Tank> {
        let mut session = self.store.begin().await?;
        session
            .find_tank(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tank", id))
    }

    /// Creates a tank owned by `owner_id`
    ///
    /// # Errors
    ///
    /// `NotFound` if the owner has no user record.
    pub async fn create(&self, owner_id: Uuid, name: String, tank_type: String) -> CoreResult<Tank> {
        let mut session = self.store.begin().await?;

        if session.find_user(owner_id).await?.is_none() {
            return Err(CoreError::not_found("user", owner_id));
        }

        let tank = session
            .insert_tank(&NewTank {
                name,
                tank_type,
                user_id: owner_id,
            })
            .await?;
        session.commit().await?;

        info!(tank_id = %tank.id, %owner_id, "Created tank");
        Ok(tank)
    }

    /// Tanks owned by a user; empty, not `NotFound`, when the user is missing
    pub async fn get_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Tank>> {
        let mut session = self.store.begin().await?;
        Ok(session.list_tanks_by_user(user_id).await?)
    }
}
