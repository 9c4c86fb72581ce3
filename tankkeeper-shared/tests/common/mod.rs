//! Fixtures shared by the integration tests
//!
//! Everything is seeded straight through a store session so that tests of
//! the repositories and the dispatcher start from a known graph.

#![allow(dead_code)]

use std::sync::Arc;

use tankkeeper_shared::auth::identity::CallerIdentity;
use tankkeeper_shared::dispatch::Dispatcher;
use tankkeeper_shared::models::{Fish, NewFish, NewTank, Tank, User, UserRole};
use tankkeeper_shared::repository::Repositories;
use tankkeeper_shared::store::{DataStore, MemoryStore};
use uuid::Uuid;

pub const BETTA: &str = "Betta splendens";
pub const NEON: &str = "Paracheirodon innesi";

/// A memory store plus a dispatcher over it
pub struct TestContext {
    pub store: MemoryStore,
    pub dispatcher: Dispatcher,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let dispatcher = Dispatcher::new(Repositories::new(Arc::new(store.clone())));
        Self { store, dispatcher }
    }

    pub fn repos(&self) -> &Repositories {
        self.dispatcher.repositories()
    }

    pub async fn user(&self, role: UserRole) -> User {
        let mut session = self.store.begin().await.unwrap();
        let user = session.insert_user(Uuid::new_v4(), role).await.unwrap();
        session.commit().await.unwrap();
        user
    }

    pub async fn identity(&self, role: UserRole) -> (User, CallerIdentity) {
        let user = self.user(role).await;
        let identity = CallerIdentity::user(user.id, user.role);
        (user, identity)
    }

    pub async fn tank(&self, owner: &User, name: &str) -> Tank {
        let mut session = self.store.begin().await.unwrap();
        let tank = session
            .insert_tank(&NewTank {
                name: name.to_string(),
                tank_type: "freshwater".to_string(),
                user_id: owner.id,
            })
            .await
            .unwrap();
        session.commit().await.unwrap();
        tank
    }

    pub async fn fish(&self, tank: Option<&Tank>, scientific_name: &str) -> Fish {
        let mut session = self.store.begin().await.unwrap();
        let fish = session
            .insert_fish(&new_fish(scientific_name, tank.map(|t| t.id)))
            .await
            .unwrap();
        session.commit().await.unwrap();
        fish
    }
}

pub fn new_fish(scientific_name: &str, tank_id: Option<Uuid>) -> NewFish {
    NewFish {
        id: Uuid::new_v4(),
        scientific_name: scientific_name.to_string(),
        common_name: format!("{} (common)", scientific_name),
        description: "Seeded fish".to_string(),
        image: "fish.png".to_string(),
        fish_type: "freshwater".to_string(),
        tank_id,
    }
}
