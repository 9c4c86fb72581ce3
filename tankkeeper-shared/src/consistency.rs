/// Relationship consistency manager
///
/// Owns every mutation that touches more than one entity of the
/// user → tank → fish graph. Each procedure runs inside a single
/// [`StoreSession`]: it either commits as a whole or, when any step fails or
/// the caller goes away, the session is dropped and nothing is published.
///
/// # Procedures
///
/// - [`RelationshipManager::delete_tank`]: delete a tank and detach it from
///   its owner
/// - [`RelationshipManager::update_tank`]: update a tank and upsert the fish
///   it was given
/// - [`RelationshipManager::fish_inventory`]: tally a user's fish by
///   scientific name
///
/// # Example
///
/// ```no_run
/// use tankkeeper_shared::consistency::RelationshipManager;
/// use tankkeeper_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(tank_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let deleted = RelationshipManager::new(&store).delete_tank(tank_id).await?;
/// println!("deleted {}", deleted.name);
/// # Ok(())
/// # }
/// ```

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{FishChanges, NewFish, Tank, TankChanges};
use crate::store::{DataStore, StoreError, StoreResult, StoreSession};

/// One fish supplied to a tank update
///
/// Matched against existing fish by `id`. `fish_type` is optional: an
/// existing fish keeps its type, a new one gets an empty type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FishUpsert {
    pub id: Uuid,
    pub scientific_name: String,
    pub common_name: String,
    pub description: String,
    pub image: String,
    pub fish_type: Option<String>,
}

impl FishUpsert {
    fn changes_for(&self, tank_id: Uuid) -> FishChanges {
        FishChanges {
            scientific_name: Some(self.scientific_name.clone()),
            common_name: Some(self.common_name.clone()),
            description: Some(self.description.clone()),
            image: Some(self.image.clone()),
            fish_type: self.fish_type.clone(),
            tank_id: Some(Some(tank_id)),
        }
    }

    fn into_new(self, tank_id: Uuid) -> NewFish {
        NewFish {
            id: self.id,
            scientific_name: self.scientific_name,
            common_name: self.common_name,
            description: self.description,
            image: self.image,
            fish_type: self.fish_type.unwrap_or_default(),
            tank_id: Some(tank_id),
        }
    }
}

/// A tank update with its nested fish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TankUpdate {
    pub id: Uuid,
    pub name: String,
    pub tank_type: String,
    /// New owner, if ownership is being transferred
    pub user_id: Option<Uuid>,
    pub fish: Vec<FishUpsert>,
}

/// Scientific name → number of fish
pub type FishInventory = BTreeMap<String, u32>;

pub struct RelationshipManager<'a> {
    store: &'a dyn DataStore,
}

impl<'a> RelationshipManager<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// Deletes a tank and removes it from its owner's collection
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tank does not exist; nothing is written
    /// - `ConsistencyError` if the owner could not be detached after the
    ///   tank row was deleted; the deletion is rolled back
    pub async fn delete_tank(&self, id: Uuid) -> CoreResult<Tank> {
        let mut session = self.store.begin().await?;

        let tank = session
            .find_tank(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tank", id))?;
        let owner_id = tank.user_id;

        let deleted = session
            .delete_tank(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tank", id))?;

        match session.detach_tank(owner_id, id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(tank_id = %id, %owner_id, "Owner still references deleted tank, rolling back");
                return Err(CoreError::consistency(
                    "Tank could not be detached from its owner",
                ));
            }
            Err(e) => {
                error!(tank_id = %id, %owner_id, error = %e, "Detaching deleted tank failed, rolling back");
                return Err(CoreError::consistency(
                    "Tank could not be detached from its owner",
                ));
            }
        }

        session.commit().await?;

        info!(tank_id = %id, %owner_id, "Deleted tank");
        Ok(deleted)
    }

    /// Updates a tank and upserts the supplied fish into it
    ///
    /// Supplied fish that exist are updated and moved into this tank; the
    /// rest are created here under their supplied IDs. Fish already in the
    /// tank but not supplied are left alone.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tank, or a supplied new owner, does not exist
    /// - `ConsistencyError` if a write fails after an earlier write; every
    ///   write is rolled back
    pub async fn update_tank(&self, update: TankUpdate) -> CoreResult<Tank> {
        let TankUpdate {
            id,
            name,
            tank_type,
            user_id,
            fish,
        } = update;

        let mut session = self.store.begin().await?;

        if session.find_tank(id).await?.is_none() {
            return Err(CoreError::not_found("tank", id));
        }

        if let Some(owner_id) = user_id {
            if session.find_user(owner_id).await?.is_none() {
                return Err(CoreError::not_found("user", owner_id));
            }
        }

        let ids: Vec<Uuid> = fish.iter().map(|f| f.id).collect();
        let existing: HashSet<Uuid> = session
            .find_fish_by_ids(&ids)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();

        let (to_update, to_create): (Vec<FishUpsert>, Vec<FishUpsert>) =
            fish.into_iter().partition(|f| existing.contains(&f.id));

        debug!(
            tank_id = %id,
            updates = to_update.len(),
            creates = to_create.len(),
            "Partitioned fish upserts"
        );

        let changes = TankChanges {
            name: Some(name),
            tank_type: Some(tank_type),
            user_id,
        };

        let mut writes = 0usize;
        let tank = match apply_tank_update(
            session.as_mut(),
            id,
            to_update,
            to_create,
            &changes,
            &mut writes,
        )
        .await
        {
            Ok(tank) => tank,
            Err(e) if writes == 0 => return Err(e.into()),
            Err(e) => {
                error!(tank_id = %id, writes, error = %e, "Tank update failed part-way, rolling back");
                return Err(CoreError::consistency("Tank update could not be completed"));
            }
        };

        session.commit().await?;

        info!(tank_id = %id, "Updated tank");
        Ok(tank)
    }

    /// Counts a user's fish by scientific name across all their tanks
    ///
    /// An unknown user, or one without tanks, yields an empty map.
    pub async fn fish_inventory(&self, user_id: Uuid) -> CoreResult<FishInventory> {
        let mut session = self.store.begin().await?;
        let fish = session.list_fish_by_owner(user_id).await?;

        let mut inventory = FishInventory::new();
        for f in fish {
            *inventory.entry(f.scientific_name).or_insert(0) += 1;
        }

        Ok(inventory)
    }
}

/// Write phase of a tank update; `writes` counts completed writes
async fn apply_tank_update(
    session: &mut dyn StoreSession,
    tank_id: Uuid,
    to_update: Vec<FishUpsert>,
    to_create: Vec<FishUpsert>,
    changes: &TankChanges,
    writes: &mut usize,
) -> StoreResult<Tank> {
    for upsert in &to_update {
        session
            .update_fish(upsert.id, &upsert.changes_for(tank_id))
            .await?
            .ok_or_else(|| StoreError::query(format!("fish {} vanished during upsert", upsert.id)))?;
        *writes += 1;
    }

    for upsert in to_create {
        session.insert_fish(&upsert.into_new(tank_id)).await?;
        *writes += 1;
    }

    let tank = session
        .update_tank(tank_id, changes)
        .await?
        .ok_or_else(|| StoreError::query(format!("tank {} vanished during update", tank_id)))?;
    *writes += 1;

    Ok(tank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_moves_fish_into_tank() {
        let tank_id = Uuid::new_v4();
        let upsert = FishUpsert {
            id: Uuid::new_v4(),
            scientific_name: "Betta splendens".to_string(),
            common_name: "Betta".to_string(),
            description: "Labyrinth fish".to_string(),
            image: "betta.png".to_string(),
            fish_type: None,
        };

        let changes = upsert.changes_for(tank_id);
        assert_eq!(changes.tank_id, Some(Some(tank_id)));
        assert_eq!(changes.fish_type, None);

        let new = upsert.into_new(tank_id);
        assert_eq!(new.tank_id, Some(tank_id));
        assert_eq!(new.fish_type, "");
    }
}
