/// Integration tests for the relationship consistency manager
///
/// Run against the in-memory store, with injected failures for the
/// rollback paths.

mod common;

use common::{TestContext, BETTA, NEON};
use tankkeeper_shared::consistency::{FishUpsert, TankUpdate};
use tankkeeper_shared::error::CoreError;
use tankkeeper_shared::models::UserRole;
use tankkeeper_shared::store::FailPoint;
use uuid::Uuid;

fn upsert(id: Uuid, scientific_name: &str, description: &str) -> FishUpsert {
    FishUpsert {
        id,
        scientific_name: scientific_name.to_string(),
        common_name: "Common".to_string(),
        description: description.to_string(),
        image: "fish.png".to_string(),
        fish_type: None,
    }
}

fn update(tank_id: Uuid, fish: Vec<FishUpsert>) -> TankUpdate {
    TankUpdate {
        id: tank_id,
        name: "Renamed".to_string(),
        tank_type: "planted".to_string(),
        user_id: None,
        fish,
    }
}

#[tokio::test]
async fn test_delete_tank_detaches_owner() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let keep = ctx.tank(&owner, "Keep").await;
    let doomed = ctx.tank(&owner, "Doomed").await;

    let deleted = ctx.repos().relationships().delete_tank(doomed.id).await.unwrap();
    assert_eq!(deleted.id, doomed.id);

    let remaining = ctx.repos().tanks().get_by_user(owner.id).await.unwrap();
    assert_eq!(remaining, vec![keep.clone()]);
    assert_eq!(ctx.store.owned_tank_ids(owner.id).await, Some(vec![keep.id]));
}

#[tokio::test]
async fn test_delete_tank_keeps_its_fish_unassociated() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Doomed").await;
    let fish = ctx.fish(Some(&tank), BETTA).await;

    ctx.repos().relationships().delete_tank(tank.id).await.unwrap();

    let survivor = ctx.repos().fish().get_one(fish.id).await.unwrap();
    assert_eq!(survivor.tank_id, None);
}

#[tokio::test]
async fn test_delete_missing_tank_is_not_found_and_users_unchanged() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    ctx.tank(&owner, "Keep").await;
    let before = ctx.store.snapshot().await;

    let err = ctx
        .repos()
        .relationships()
        .delete_tank(Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { entity: "tank", .. }));
    assert_eq!(ctx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_failed_detach_rolls_back_delete() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Sticky").await;
    let before = ctx.store.snapshot().await;

    ctx.store.fail_on(FailPoint::DetachTank);
    let err = ctx.repos().relationships().delete_tank(tank.id).await.unwrap_err();

    assert_eq!(err.code(), "consistency_error");
    assert!(!err.is_retryable());
    assert_eq!(ctx.store.snapshot().await, before);
    assert_eq!(ctx.repos().tanks().get_one(tank.id).await.unwrap(), tank);
}

#[tokio::test]
async fn test_failed_tank_row_delete_keeps_its_kind() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Flaky").await;

    ctx.store.fail_on(FailPoint::DeleteTank);
    let err = ctx.repos().relationships().delete_tank(tank.id).await.unwrap_err();

    assert!(matches!(err, CoreError::Unavailable));
    assert!(ctx.repos().tanks().get_one(tank.id).await.is_ok());
}

#[tokio::test]
async fn test_update_tank_upserts_fish() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Living room").await;
    let existing = ctx.fish(Some(&tank), BETTA).await;
    let omitted = ctx.fish(Some(&tank), NEON).await;
    let new_id = Uuid::new_v4();

    let updated = ctx
        .repos()
        .relationships()
        .update_tank(update(
            tank.id,
            vec![
                upsert(existing.id, BETTA, "Bubble nest builder"),
                upsert(new_id, NEON, "New arrival"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.tank_type, "planted");
    assert_eq!(updated.user_id, owner.id);

    let fish = ctx.repos().fish();
    let refreshed = fish.get_one(existing.id).await.unwrap();
    assert_eq!(refreshed.description, "Bubble nest builder");
    assert_eq!(refreshed.fish_type, existing.fish_type);
    assert_eq!(refreshed.tank_id, Some(tank.id));

    let created = fish.get_one(new_id).await.unwrap();
    assert_eq!(created.description, "New arrival");
    assert_eq!(created.tank_id, Some(tank.id));

    assert_eq!(fish.get_one(omitted.id).await.unwrap(), omitted);
    assert_eq!(fish.get_by_tank(tank.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_tank_moves_fish_between_tanks() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let from = ctx.tank(&owner, "From").await;
    let to = ctx.tank(&owner, "To").await;
    let fish = ctx.fish(Some(&from), BETTA).await;

    ctx.repos()
        .relationships()
        .update_tank(update(to.id, vec![upsert(fish.id, BETTA, "Moved")]))
        .await
        .unwrap();

    assert!(ctx.repos().fish().get_by_tank(from.id).await.unwrap().is_empty());
    assert_eq!(ctx.repos().fish().get_by_tank(to.id).await.unwrap()[0].id, fish.id);
}

#[tokio::test]
async fn test_update_tank_transfers_ownership() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let heir = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Heirloom").await;

    let mut change = update(tank.id, Vec::new());
    change.user_id = Some(heir.id);
    let updated = ctx.repos().relationships().update_tank(change).await.unwrap();

    assert_eq!(updated.user_id, heir.id);
    assert!(ctx.repos().tanks().get_by_user(owner.id).await.unwrap().is_empty());
    assert_eq!(ctx.repos().tanks().get_by_user(heir.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_tank_to_unknown_owner_is_not_found() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Heirloom").await;
    let before = ctx.store.snapshot().await;

    let mut change = update(tank.id, vec![upsert(Uuid::new_v4(), BETTA, "Never")]);
    change.user_id = Some(Uuid::new_v4());
    let err = ctx.repos().relationships().update_tank(change).await.unwrap_err();

    assert!(matches!(err, CoreError::NotFound { entity: "user", .. }));
    assert_eq!(ctx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_update_missing_tank_writes_nothing() {
    let ctx = TestContext::new();
    let before = ctx.store.snapshot().await;

    let err = ctx
        .repos()
        .relationships()
        .update_tank(update(Uuid::new_v4(), vec![upsert(Uuid::new_v4(), BETTA, "Never")]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { entity: "tank", .. }));
    assert_eq!(ctx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_failure_after_first_write_rolls_back() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Living room").await;
    let existing = ctx.fish(Some(&tank), BETTA).await;
    let before = ctx.store.snapshot().await;

    ctx.store.fail_on(FailPoint::InsertFish);
    let err = ctx
        .repos()
        .relationships()
        .update_tank(update(
            tank.id,
            vec![
                upsert(existing.id, BETTA, "Changed"),
                upsert(Uuid::new_v4(), NEON, "New"),
            ],
        ))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "consistency_error");
    assert_eq!(ctx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_failure_on_first_write_keeps_its_kind() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Living room").await;

    ctx.store.fail_on(FailPoint::UpdateTank);
    let err = ctx
        .repos()
        .relationships()
        .update_tank(update(tank.id, Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Unavailable));
    assert_eq!(ctx.repos().tanks().get_one(tank.id).await.unwrap(), tank);
}

#[tokio::test]
async fn test_inventory_sums_across_tanks() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let first = ctx.tank(&owner, "First").await;
    let second = ctx.tank(&owner, "Second").await;
    ctx.fish(Some(&first), BETTA).await;
    ctx.fish(Some(&second), BETTA).await;
    ctx.fish(Some(&second), NEON).await;

    let stranger = ctx.user(UserRole::User).await;
    let elsewhere = ctx.tank(&stranger, "Elsewhere").await;
    ctx.fish(Some(&elsewhere), BETTA).await;
    ctx.fish(None, BETTA).await;

    let inventory = ctx.repos().relationships().fish_inventory(owner.id).await.unwrap();

    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[BETTA], 2);
    assert_eq!(inventory[NEON], 1);
}

#[tokio::test]
async fn test_inventory_of_unknown_user_is_empty() {
    let ctx = TestContext::new();
    let inventory = ctx
        .repos()
        .relationships()
        .fish_inventory(Uuid::new_v4())
        .await
        .unwrap();
    assert!(inventory.is_empty());
}
