//! In-memory store
//!
//! Sessions serialize on a single async mutex. A session works on a copy of
//! the state and swaps it in on commit, so an abandoned session (error,
//! early return, cancelled future) leaves nothing behind.
//!
//! Failures can be injected per [`FailPoint`] to drive error paths that a
//! healthy in-process map would never produce.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{DataStore, StoreError, StoreResult, StoreSession};
use crate::models::{Fish, FishChanges, NewFish, NewTank, Tank, TankChanges, User, UserRole};

/// Points at which [`MemoryStore`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    Commit,
    InsertFish,
    UpdateFish,
    InsertTank,
    UpdateTank,
    DeleteTank,
    DetachTank,
    FindUser,
    HealthCheck,
}

#[derive(Debug, Clone)]
struct UserEntry {
    user: User,
    tank_ids: BTreeSet<Uuid>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    fish: HashMap<Uuid, Fish>,
    tanks: HashMap<Uuid, Tank>,
    users: HashMap<Uuid, UserEntry>,
}

/// Point-in-time copy of everything in a [`MemoryStore`]
///
/// Collections are sorted by ID so snapshots compare with `==`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub fish: Vec<Fish>,
    pub tanks: Vec<Tank>,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default)]
struct FaultPlan {
    armed: Arc<StdMutex<HashSet<FailPoint>>>,
}

impl FaultPlan {
    fn arm(&self, point: FailPoint) {
        self.armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(point);
    }

    /// Fails once if `point` is armed
    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        let fired = self
            .armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&point);

        if fired {
            debug!(?point, "Injected store failure");
            return Err(StoreError::unavailable(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }
}

/// In-memory [`DataStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: FaultPlan,
    sessions_opened: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call at `point` fail with [`StoreError::Unavailable`]
    pub fn fail_on(&self, point: FailPoint) {
        self.faults.arm(point);
    }

    /// Number of sessions opened so far, including failed attempts
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Copies the committed state
    pub async fn snapshot(&self) -> MemorySnapshot {
        let state = self.state.lock().await;

        let mut fish: Vec<Fish> = state.fish.values().cloned().collect();
        fish.sort_by_key(|f| f.id);
        let mut tanks: Vec<Tank> = state.tanks.values().cloned().collect();
        tanks.sort_by_key(|t| t.id);
        let mut users: Vec<User> = state.users.values().map(|e| e.user.clone()).collect();
        users.sort_by_key(|u| u.id);

        MemorySnapshot { fish, tanks, users }
    }

    /// Committed tank collection of a user, `None` if the user is unknown
    pub async fn owned_tank_ids(&self, user_id: Uuid) -> Option<Vec<Uuid>> {
        let state = self.state.lock().await;
        state
            .users
            .get(&user_id)
            .map(|entry| entry.tank_ids.iter().copied().collect())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.faults.trip(FailPoint::Begin)?;

        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemorySession {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.faults.trip(FailPoint::HealthCheck)
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: FaultPlan,
}

fn oldest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
{
    items.sort_by_key(|item| key(item));
    items
}

impl MemorySession {
    fn ensure_tank(&self, tank_id: Option<Uuid>) -> StoreResult<()> {
        match tank_id {
            Some(id) if !self.working.tanks.contains_key(&id) => Err(StoreError::constraint(
                format!("fish.tank_id references missing tank {}", id),
            )),
            _ => Ok(()),
        }
    }

    fn release_fish_of(&mut self, tank_id: Uuid) {
        let now = Utc::now();
        for fish in self.working.fish.values_mut() {
            if fish.tank_id == Some(tank_id) {
                fish.tank_id = None;
                fish.updated_at = now;
            }
        }
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn list_fish(&mut self) -> StoreResult<Vec<Fish>> {
        let fish = self.working.fish.values().cloned().collect();
        Ok(oldest_first(fish, |f| (f.created_at, f.id)))
    }

    async fn find_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>> {
        Ok(self.working.fish.get(&id).cloned())
    }

    async fn find_fish_by_ids(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Fish>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.fish.get(id).cloned())
            .collect())
    }

    async fn list_fish_by_tank(&mut self, tank_id: Uuid) -> StoreResult<Vec<Fish>> {
        let fish = self
            .working
            .fish
            .values()
            .filter(|f| f.tank_id == Some(tank_id))
            .cloned()
            .collect();
        Ok(oldest_first(fish, |f| (f.created_at, f.id)))
    }

    async fn list_fish_by_owner(&mut self, user_id: Uuid) -> StoreResult<Vec<Fish>> {
        let Some(entry) = self.working.users.get(&user_id) else {
            return Ok(Vec::new());
        };

        let fish = self
            .working
            .fish
            .values()
            .filter(|f| f.tank_id.map_or(false, |t| entry.tank_ids.contains(&t)))
            .cloned()
            .collect();
        Ok(oldest_first(fish, |f| (f.created_at, f.id)))
    }

    async fn insert_fish(&mut self, new: &NewFish) -> StoreResult<Fish> {
        self.faults.trip(FailPoint::InsertFish)?;

        if self.working.fish.contains_key(&new.id) {
            return Err(StoreError::constraint(format!("fish {} already exists", new.id)));
        }
        self.ensure_tank(new.tank_id)?;

        let now = Utc::now();
        let fish = Fish {
            id: new.id,
            scientific_name: new.scientific_name.clone(),
            common_name: new.common_name.clone(),
            description: new.description.clone(),
            image: new.image.clone(),
            fish_type: new.fish_type.clone(),
            tank_id: new.tank_id,
            created_at: now,
            updated_at: now,
        };
        self.working.fish.insert(fish.id, fish.clone());
        Ok(fish)
    }

    async fn update_fish(&mut self, id: Uuid, changes: &FishChanges) -> StoreResult<Option<Fish>> {
        self.faults.trip(FailPoint::UpdateFish)?;

        if let Some(tank_id) = changes.tank_id {
            self.ensure_tank(tank_id)?;
        }

        let Some(fish) = self.working.fish.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(fish);
        fish.updated_at = Utc::now();
        Ok(Some(fish.clone()))
    }

    async fn delete_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>> {
        Ok(self.working.fish.remove(&id))
    }

    async fn list_tanks(&mut self) -> StoreResult<Vec<Tank>> {
        let tanks = self.working.tanks.values().cloned().collect();
        Ok(oldest_first(tanks, |t| (t.created_at, t.id)))
    }

    async fn find_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>> {
        Ok(self.working.tanks.get(&id).cloned())
    }

    async fn list_tanks_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Tank>> {
        let Some(entry) = self.working.users.get(&user_id) else {
            return Ok(Vec::new());
        };

        let tanks = entry
            .tank_ids
            .iter()
            .filter_map(|id| self.working.tanks.get(id).cloned())
            .collect();
        Ok(oldest_first(tanks, |t| (t.created_at, t.id)))
    }

    async fn insert_tank(&mut self, new: &NewTank) -> StoreResult<Tank> {
        self.faults.trip(FailPoint::InsertTank)?;

        let Some(owner) = self.working.users.get_mut(&new.user_id) else {
            return Err(StoreError::constraint(format!(
                "tanks.user_id references missing user {}",
                new.user_id
            )));
        };

        let now = Utc::now();
        let tank = Tank {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            tank_type: new.tank_type.clone(),
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };
        owner.tank_ids.insert(tank.id);
        self.working.tanks.insert(tank.id, tank.clone());
        Ok(tank)
    }

    async fn update_tank(&mut self, id: Uuid, changes: &TankChanges) -> StoreResult<Option<Tank>> {
        self.faults.trip(FailPoint::UpdateTank)?;

        let Some(previous_owner) = self.working.tanks.get(&id).map(|t| t.user_id) else {
            return Ok(None);
        };

        if let Some(new_owner) = changes.user_id.filter(|owner| *owner != previous_owner) {
            let Some(entry) = self.working.users.get_mut(&new_owner) else {
                return Err(StoreError::constraint(format!(
                    "tanks.user_id references missing user {}",
                    new_owner
                )));
            };
            entry.tank_ids.insert(id);
            if let Some(old) = self.working.users.get_mut(&previous_owner) {
                old.tank_ids.remove(&id);
            }
        }

        let Some(tank) = self.working.tanks.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(tank);
        tank.updated_at = Utc::now();
        Ok(Some(tank.clone()))
    }

    async fn delete_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>> {
        self.faults.trip(FailPoint::DeleteTank)?;

        let removed = self.working.tanks.remove(&id);
        if removed.is_some() {
            self.release_fish_of(id);
        }
        Ok(removed)
    }

    async fn detach_tank(&mut self, owner_id: Uuid, tank_id: Uuid) -> StoreResult<bool> {
        self.faults.trip(FailPoint::DetachTank)?;

        let still_owned = self
            .working
            .tanks
            .get(&tank_id)
            .map_or(false, |t| t.user_id == owner_id);

        let Some(owner) = self.working.users.get_mut(&owner_id) else {
            return Ok(false);
        };
        if still_owned {
            return Ok(false);
        }

        owner.tank_ids.remove(&tank_id);
        owner.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let users = self.working.users.values().map(|e| e.user.clone()).collect();
        Ok(oldest_first(users, |u| (u.created_at, u.id)))
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        self.faults.trip(FailPoint::FindUser)?;
        Ok(self.working.users.get(&id).map(|e| e.user.clone()))
    }

    async fn insert_user(&mut self, id: Uuid, role: UserRole) -> StoreResult<User> {
        if self.working.users.contains_key(&id) {
            return Err(StoreError::constraint(format!("user {} already exists", id)));
        }

        let now = Utc::now();
        let user = User {
            id,
            role,
            created_at: now,
            updated_at: now,
        };
        self.working.users.insert(
            id,
            UserEntry {
                user: user.clone(),
                tank_ids: BTreeSet::new(),
            },
        );
        Ok(user)
    }

    async fn provision_user(&mut self, id: Uuid) -> StoreResult<User> {
        if let Some(entry) = self.working.users.get(&id) {
            return Ok(entry.user.clone());
        }
        self.insert_user(id, UserRole::User).await
    }

    async fn update_user_role(&mut self, id: Uuid, role: UserRole) -> StoreResult<Option<User>> {
        let Some(entry) = self.working.users.get_mut(&id) else {
            return Ok(None);
        };
        entry.user.role = role;
        entry.user.updated_at = Utc::now();
        Ok(Some(entry.user.clone()))
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let Some(entry) = self.working.users.remove(&id) else {
            return Ok(None);
        };

        for tank_id in &entry.tank_ids {
            if self.working.tanks.remove(tank_id).is_some() {
                self.release_fish_of(*tank_id);
            }
        }
        Ok(Some(entry.user))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.faults.trip(FailPoint::Commit)?;

        let MemorySession {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
