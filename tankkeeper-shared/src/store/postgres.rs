//! PostgreSQL store
//!
//! Each [`StoreSession`] wraps one SQL transaction. sqlx rolls the
//! transaction back when it is dropped uncommitted.
//!
//! Relations are plain foreign keys (see `migrations/`):
//!
//! - `tanks.user_id -> users.id ON DELETE CASCADE`
//! - `fish.tank_id -> tanks.id ON DELETE SET NULL`

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{DataStore, StoreResult, StoreSession};
use crate::db::pool;
use crate::models::{Fish, FishChanges, NewFish, NewTank, Tank, TankChanges, User, UserRole};

const FISH_COLUMNS: &str = "id, scientific_name, common_name, description, image, fish_type, \
                            tank_id, created_at, updated_at";
const TANK_COLUMNS: &str = "id, name, tank_type, user_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, role, created_at, updated_at";

/// [`DataStore`] backed by a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }
}

/// Unit of work over one Postgres transaction
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn list_fish(&mut self) -> StoreResult<Vec<Fish>> {
        let fish = sqlx::query_as::<_, Fish>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn find_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>> {
        let fish = sqlx::query_as::<_, Fish>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn find_fish_by_ids(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Fish>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // FOR UPDATE keeps the existing/new partition stable until commit
        let fish = sqlx::query_as::<_, Fish>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish WHERE id = ANY($1) FOR UPDATE"
        ))
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn list_fish_by_tank(&mut self, tank_id: Uuid) -> StoreResult<Vec<Fish>> {
        let fish = sqlx::query_as::<_, Fish>(&format!(
            "SELECT {FISH_COLUMNS} FROM fish WHERE tank_id = $1 ORDER BY created_at, id"
        ))
        .bind(tank_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn list_fish_by_owner(&mut self, user_id: Uuid) -> StoreResult<Vec<Fish>> {
        let fish = sqlx::query_as::<_, Fish>(
            r#"
            SELECT f.id, f.scientific_name, f.common_name, f.description, f.image,
                   f.fish_type, f.tank_id, f.created_at, f.updated_at
            FROM fish f
            JOIN tanks t ON t.id = f.tank_id
            WHERE t.user_id = $1
            ORDER BY f.created_at, f.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn insert_fish(&mut self, new: &NewFish) -> StoreResult<Fish> {
        let fish = sqlx::query_as::<_, Fish>(&format!(
            r#"
            INSERT INTO fish (id, scientific_name, common_name, description, image, fish_type, tank_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {FISH_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(&new.scientific_name)
        .bind(&new.common_name)
        .bind(&new.description)
        .bind(&new.image)
        .bind(&new.fish_type)
        .bind(new.tank_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn update_fish(&mut self, id: Uuid, changes: &FishChanges) -> StoreResult<Option<Fish>> {
        // $7 says whether tank_id is part of the change, $8 is the new value
        let fish = sqlx::query_as::<_, Fish>(&format!(
            r#"
            UPDATE fish SET
                scientific_name = COALESCE($2, scientific_name),
                common_name = COALESCE($3, common_name),
                description = COALESCE($4, description),
                image = COALESCE($5, image),
                fish_type = COALESCE($6, fish_type),
                tank_id = CASE WHEN $7 THEN $8 ELSE tank_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FISH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.scientific_name.as_deref())
        .bind(changes.common_name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.image.as_deref())
        .bind(changes.fish_type.as_deref())
        .bind(changes.tank_id.is_some())
        .bind(changes.tank_id.flatten())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn delete_fish(&mut self, id: Uuid) -> StoreResult<Option<Fish>> {
        let fish = sqlx::query_as::<_, Fish>(&format!(
            "DELETE FROM fish WHERE id = $1 RETURNING {FISH_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(fish)
    }

    async fn list_tanks(&mut self) -> StoreResult<Vec<Tank>> {
        let tanks = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tanks)
    }

    async fn find_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(tank)
    }

    async fn list_tanks_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Tank>> {
        let tanks = sqlx::query_as::<_, Tank>(&format!(
            "SELECT {TANK_COLUMNS} FROM tanks WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tanks)
    }

    async fn insert_tank(&mut self, new: &NewTank) -> StoreResult<Tank> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            r#"
            INSERT INTO tanks (name, tank_type, user_id)
            VALUES ($1, $2, $3)
            RETURNING {TANK_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.tank_type)
        .bind(new.user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(tank)
    }

    async fn update_tank(&mut self, id: Uuid, changes: &TankChanges) -> StoreResult<Option<Tank>> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            r#"
            UPDATE tanks SET
                name = COALESCE($2, name),
                tank_type = COALESCE($3, tank_type),
                user_id = COALESCE($4, user_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TANK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.tank_type.as_deref())
        .bind(changes.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(tank)
    }

    async fn delete_tank(&mut self, id: Uuid) -> StoreResult<Option<Tank>> {
        let tank = sqlx::query_as::<_, Tank>(&format!(
            "DELETE FROM tanks WHERE id = $1 RETURNING {TANK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(tank)
    }

    async fn detach_tank(&mut self, owner_id: Uuid, tank_id: Uuid) -> StoreResult<bool> {
        // Touches the owner row only if it exists and no longer points at the tank
        let detached: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE users SET updated_at = NOW()
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM tanks WHERE id = $2 AND user_id = $1)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(tank_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        debug!(%owner_id, %tank_id, detached = detached.is_some(), "Detached tank from owner");
        Ok(detached.is_some())
    }

    async fn list_users(&mut self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(users)
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn insert_user(&mut self, id: Uuid, role: UserRole) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, role) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn provision_user(&mut self, id: Uuid) -> StoreResult<User> {
        sqlx::query("INSERT INTO users (id, role) VALUES ($1, 'USER') ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn update_user_role(&mut self, id: Uuid, role: UserRole) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
