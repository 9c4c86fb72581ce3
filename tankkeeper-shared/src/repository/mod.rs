//! Entity repositories
//!
//! Thin, per-entity views over a [`DataStore`]. Each call runs in its own
//! unit of work and turns "no such row" into [`CoreError::NotFound`], so
//! callers can always tell a missing record from an empty collection.
//!
//! Tanks have no raw update/delete here: those paths keep the user → tank
//! → fish graph consistent and live in [`RelationshipManager`].
//!
//! [`CoreError::NotFound`]: crate::error::CoreError::NotFound

pub mod fish;
pub mod tank;
pub mod user;

use std::sync::Arc;

use crate::consistency::RelationshipManager;
use crate::store::DataStore;

pub use fish::FishRepository;
pub use tank::TankRepository;
pub use user::UserRepository;

/// The repository set handed to every operation handler
#[derive(Clone)]
pub struct Repositories {
    store: Arc<dyn DataStore>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub fn fish(&self) -> FishRepository<'_> {
        FishRepository::new(self.store.as_ref())
    }

    pub fn tanks(&self) -> TankRepository<'_> {
        TankRepository::new(self.store.as_ref())
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    pub fn relationships(&self) -> RelationshipManager<'_> {
        RelationshipManager::new(self.store.as_ref())
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
