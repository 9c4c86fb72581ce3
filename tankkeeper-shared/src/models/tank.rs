/// Tank model
///
/// A tank always has exactly one owner. Fish point at their tank through
/// `fish.tank_id`; a tank's fish collection is derived from that column.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tanks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     tank_type VARCHAR(255) NOT NULL,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tank model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tank {
    /// Unique tank ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Tank type (freshwater, reef, ...)
    #[serde(rename = "type")]
    pub tank_type: String,

    /// Owning user
    pub user_id: Uuid,

    /// When the tank was created
    pub created_at: DateTime<Utc>,

    /// When the tank was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tank
///
/// The owner is never part of the input: it is always the caller.
#[derive(Debug, Clone)]
pub struct NewTank {
    pub name: String,
    pub tank_type: String,
    pub user_id: Uuid,
}

/// Changes applied to a tank
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct TankChanges {
    pub name: Option<String>,
    pub tank_type: Option<String>,
    pub user_id: Option<Uuid>,
}

impl TankChanges {
    /// Applies the changes to an in-memory tank
    pub fn apply_to(&self, tank: &mut Tank) {
        if let Some(ref name) = self.name {
            tank.name = name.clone();
        }
        if let Some(ref tank_type) = self.tank_type {
            tank.tank_type = tank_type.clone();
        }
        if let Some(user_id) = self.user_id {
            tank.user_id = user_id;
        }
    }
}
