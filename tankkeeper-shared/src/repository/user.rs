//! User repository
//!
//! Users are only ever created with role USER. Role changes go through
//! [`UserRepository::update`], [`UserRepository::promote`] and
//! [`UserRepository::demote`], all of which are idempotent.

use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{User, UserRole};
use crate::store::DataStore;

pub struct UserRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> CoreResult<Vec<User>> {
        let mut session = self.store.begin().await?;
        Ok(session.list_users().await?)
    }

    pub async fn get_one(&self, id: Uuid) -> CoreResult<User> {
        let mut session = self.store.begin().await?;
        session
            .find_user(id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    /// Creates a user with a fresh ID and role USER
    pub async fn create(&self) -> CoreResult<User> {
        let mut session = self.store.begin().await?;
        let user = session.insert_user(Uuid::new_v4(), UserRole::User).await?;
        session.commit().await?;

        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Ensures a record exists for an authenticated subject
    ///
    /// Existing users are returned untouched, whatever their role.
    pub async fn provision(&self, id: Uuid) -> CoreResult<User> {
        let mut session = self.store.begin().await?;
        let user = session.provision_user(id).await?;
        session.commit().await?;
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, role: UserRole) -> CoreResult<User> {
        let mut session = self.store.begin().await?;
        let user = session
            .update_user_role(id, role)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))?;
        session.commit().await?;

        info!(user_id = %id, role = %role, "Set user role");
        Ok(user)
    }

    pub async fn promote(&self, id: Uuid) -> CoreResult<User> {
        self.update(id, UserRole::Admin).await
    }

    pub async fn demote(&self, id: Uuid) -> CoreResult<User> {
        self.update(id, UserRole::User).await
    }

    /// Deletes the user and, with them, the tanks they own
    pub async fn delete(&self, id: Uuid) -> CoreResult<User> {
        let mut session = self.store.begin().await?;
        let user = session
            .delete_user(id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))?;
        session.commit().await?;

        info!(user_id = %id, "Deleted user");
        Ok(user)
    }
}
