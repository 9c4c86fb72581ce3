//! Storage abstraction
//!
//! The core never talks to a database directly. Every read and write goes
//! through a [`StoreSession`], a unit of work opened with
//! [`DataStore::begin`]:
//!
//! - writes become visible to other callers only after [`StoreSession::commit`];
//! - dropping a session without committing discards its writes, which also
//!   covers early returns and cancelled futures.
//!
//! Two adapters are provided:
//!
//! - [`postgres::PostgresStore`]: one SQL transaction per session
//! - [`memory::MemoryStore`]: in-process maps, used by tests and local runs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Fish, FishChanges, NewFish, NewTank, Tank, TankChanges, User, UserRole};

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PostgresStore;

/// Result alias for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store adapter
///
/// The messages carry adapter detail for logs. They are never shown to
/// callers; see [`crate::error::CoreError`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable, timed out, or the pool is exhausted/closed
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A uniqueness or foreign-key constraint rejected the write
    #[error("constraint violation: {message}")]
    Constraint { message: String },

    /// Any other adapter failure
    #[error("store query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::Constraint {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        StoreError::Query {
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                StoreError::unavailable(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return StoreError::constraint(format!("{} ({})", db_err, constraint));
                }
                StoreError::query(db_err.to_string())
            }
            other => StoreError::query(other.to_string()),
        }
    }
}

/// Entry point into a store
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Opens a unit of work
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>>;

    /// Verifies the store is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

/// A unit of work against the store
///
/// Find calls return `Ok(None)` / empty vectors for missing rows; deciding
/// whether absence is an error is the caller's job.
#[async_trait]
pub trait StoreSession: Send {
    // Fish

    /// All fish, oldest first
    async fn list_fish(&mut self) -> StoreResult<Vec<Fish>>;

    async fn find_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>>;

    /// The subset of `ids` that exist
    async fn find_fish_by_ids(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Fish>>;

    /// Fish whose tank is `tank_id`; empty if the tank does not exist
    async fn list_fish_by_tank(&mut self, tank_id: Uuid) -> StoreResult<Vec<Fish>>;

    /// Fish in every tank owned by `user_id`
    async fn list_fish_by_owner(&mut self, user_id: Uuid) -> StoreResult<Vec<Fish>>;

    async fn insert_fish(&mut self, fish: &NewFish) -> StoreResult<Fish>;

    async fn update_fish(&mut self, id: Uuid, changes: &FishChanges) -> StoreResult<Option<Fish>>;

    async fn delete_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>>;

    // Tanks

    /// All tanks, oldest first
    async fn list_tanks(&mut self) -> StoreResult<Vec<Tank>>;

    async fn find_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>>;

    /// Tanks owned by `user_id`; empty if the user does not exist
    async fn list_tanks_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Tank>>;

    async fn insert_tank(&mut self, tank: &NewTank) -> StoreResult<Tank>;

    async fn update_tank(&mut self, id: Uuid, changes: &TankChanges) -> StoreResult<Option<Tank>>;

    /// Deletes the tank row. Its fish keep existing with no tank.
    async fn delete_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>>;

    /// Removes `tank_id` from the owner's tank collection.
    ///
    /// Returns `true` when the owner exists and no longer references the
    /// tank, `false` when the owner is missing or still references it.
    async fn detach_tank(&mut self, owner_id: Uuid, tank_id: Uuid) -> StoreResult<bool>;

    // Users

    /// All users, oldest first
    async fn list_users(&mut self) -> StoreResult<Vec<User>>;

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_user(&mut self, id: Uuid, role: UserRole) -> StoreResult<User>;

    /// Inserts a USER with this ID unless it already exists, returning the
    /// stored record either way
    async fn provision_user(&mut self, id: Uuid) -> StoreResult<User>;

    async fn update_user_role(&mut self, id: Uuid, role: UserRole) -> StoreResult<Option<User>>;

    /// Deletes the user together with the tanks they own
    async fn delete_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    // Unit of work

    /// Publishes every write made through this session
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
