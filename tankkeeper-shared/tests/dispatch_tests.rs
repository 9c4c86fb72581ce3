/// Integration tests for the operation dispatcher
///
/// Covers the tier gate over the whole catalogue, input rejection before
/// store access, and the catalogue's observable behaviours.

mod common;

use common::{TestContext, BETTA};
use serde_json::{json, Value};
use tankkeeper_shared::auth::authorization::AccessTier;
use tankkeeper_shared::auth::identity::CallerIdentity;
use tankkeeper_shared::dispatch::Operation;
use tankkeeper_shared::error::CoreError;
use tankkeeper_shared::models::UserRole;
use uuid::Uuid;

/// A well-formed input for every operation, aimed at `target`
fn sample_input(op: Operation, target: Uuid) -> Value {
    let fish = json!({
        "scientificName": BETTA,
        "commonName": "Betta",
        "description": "Labyrinth fish",
        "image": "betta.png",
        "type": "freshwater"
    });

    match op {
        Operation::FishGetAll | Operation::TankGetAllGlobal | Operation::UserGetAll | Operation::UserCreate => {
            Value::Null
        }
        Operation::FishCreate => fish,
        Operation::FishUpdate => {
            let mut input = fish;
            input["id"] = json!(target);
            input
        }
        Operation::FishGetByTank => json!({ "tankId": target }),
        Operation::FishGetByUser | Operation::TankGetAllByUser => json!({ "userId": target }),
        Operation::TankCreate => json!({ "name": "Reef", "type": "saltwater" }),
        Operation::TankUpdate => json!({
            "id": target,
            "name": "Reef",
            "type": "saltwater",
            "fish": []
        }),
        Operation::UserUpdate => json!({ "id": target, "role": "ADMIN" }),
        _ => json!({ "id": target }),
    }
}

#[tokio::test]
async fn test_admin_operations_reject_non_admins_without_writes() {
    let ctx = TestContext::new();
    let (owner, member) = ctx.identity(UserRole::User).await;
    let tank = ctx.tank(&owner, "Reef").await;
    ctx.fish(Some(&tank), BETTA).await;
    let before = ctx.store.snapshot().await;

    for op in Operation::ALL.into_iter().filter(|op| op.tier() == AccessTier::Admin) {
        for caller in [CallerIdentity::Anonymous, member] {
            let err = ctx
                .dispatcher
                .dispatch_operation(op, &caller, sample_input(op, owner.id))
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Unauthorized), "{op} let {caller:?} through");
        }
    }

    assert_eq!(ctx.store.snapshot().await, before);
}

#[tokio::test]
async fn test_user_operations_reject_anonymous_without_store_access() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Reef").await;
    let sessions = ctx.store.sessions_opened();

    for op in Operation::ALL.into_iter().filter(|op| op.tier() == AccessTier::User) {
        let err = ctx
            .dispatcher
            .dispatch_operation(op, &CallerIdentity::Anonymous, sample_input(op, tank.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized", "{op}");
    }

    assert_eq!(ctx.store.sessions_opened(), sessions);
}

#[tokio::test]
async fn test_user_operations_accept_any_authenticated_role() {
    for role in [UserRole::User, UserRole::Admin] {
        let ctx = TestContext::new();
        let (_, caller) = ctx.identity(role).await;
        let stranger = ctx.user(UserRole::User).await;
        let tank = ctx.tank(&stranger, "Not mine").await;

        let created = ctx
            .dispatcher
            .dispatch("tank.create", &caller, sample_input(Operation::TankCreate, tank.id))
            .await
            .unwrap();
        assert_eq!(created["userId"], json!(caller.user_id().unwrap()));

        ctx.dispatcher
            .dispatch("tank.update", &caller, sample_input(Operation::TankUpdate, tank.id))
            .await
            .unwrap();

        ctx.dispatcher
            .dispatch("tank.delete", &caller, json!({ "id": tank.id }))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_admin_can_run_admin_operations() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.identity(UserRole::Admin).await;

    let created = ctx
        .dispatcher
        .dispatch("fish.create", &admin, sample_input(Operation::FishCreate, Uuid::nil()))
        .await
        .unwrap();
    assert_eq!(created["scientificName"], BETTA);
    assert_eq!(created["tankId"], Value::Null);

    let users = ctx.dispatcher.dispatch("user.getAll", &admin, Value::Null).await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_operations_allow_anonymous() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let tank = ctx.tank(&owner, "Reef").await;
    let anon = CallerIdentity::Anonymous;

    for op in Operation::ALL.into_iter().filter(|op| op.tier() == AccessTier::Public) {
        let target = match op {
            Operation::FishGetOne => ctx.fish(Some(&tank), BETTA).await.id,
            Operation::FishGetByUser | Operation::TankGetAllByUser => owner.id,
            _ => tank.id,
        };

        ctx.dispatcher
            .dispatch_operation(op, &anon, sample_input(op, target))
            .await
            .unwrap_or_else(|e| panic!("{op} failed for anonymous caller: {e:?}"));
    }
}

#[tokio::test]
async fn test_fish_by_missing_tank_is_empty_list() {
    let ctx = TestContext::new();

    let fish = ctx
        .dispatcher
        .dispatch(
            "fish.getByTank",
            &CallerIdentity::Anonymous,
            json!({ "tankId": Uuid::new_v4() }),
        )
        .await
        .unwrap();

    assert_eq!(fish, json!([]));
}

#[tokio::test]
async fn test_fish_by_user_is_a_tally() {
    let ctx = TestContext::new();
    let owner = ctx.user(UserRole::User).await;
    let first = ctx.tank(&owner, "First").await;
    let second = ctx.tank(&owner, "Second").await;
    ctx.fish(Some(&first), BETTA).await;
    ctx.fish(Some(&second), BETTA).await;

    let tally = ctx
        .dispatcher
        .dispatch("fish.getFishByUser", &CallerIdentity::Anonymous, json!({ "userId": owner.id }))
        .await
        .unwrap();

    assert_eq!(tally, json!({ BETTA: 2 }));
}

#[tokio::test]
async fn test_promote_twice_is_idempotent() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.identity(UserRole::Admin).await;
    let target = ctx.user(UserRole::User).await;

    for _ in 0..2 {
        let user = ctx
            .dispatcher
            .dispatch("user.promoteToAdmin", &admin, json!({ "id": target.id }))
            .await
            .unwrap();
        assert_eq!(user["role"], "ADMIN");
    }
}

#[tokio::test]
async fn test_user_create_ignores_supplied_role() {
    let ctx = TestContext::new();

    let user = ctx
        .dispatcher
        .dispatch("user.create", &CallerIdentity::Anonymous, json!({ "role": "ADMIN" }))
        .await
        .unwrap();

    assert_eq!(user["role"], "USER");
}

#[tokio::test]
async fn test_tank_delete_removes_from_owner_listing() {
    let ctx = TestContext::new();
    let (owner, caller) = ctx.identity(UserRole::User).await;
    let tank = ctx.tank(&owner, "Reef").await;

    let deleted = ctx
        .dispatcher
        .dispatch("tank.delete", &caller, json!({ "id": tank.id }))
        .await
        .unwrap();
    assert_eq!(deleted["id"], json!(tank.id));

    let listing = ctx
        .dispatcher
        .dispatch("tank.getAllByUser", &caller, json!({ "userId": owner.id }))
        .await
        .unwrap();
    assert_eq!(listing, json!([]));
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let ctx = TestContext::new();
    let (_, caller) = ctx.identity(UserRole::User).await;

    let err = ctx
        .dispatcher
        .dispatch("tank.delete", &caller, json!({ "id": Uuid::new_v4() }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    let err = ctx
        .dispatcher
        .dispatch("fish.getOne", &caller, json!({ "id": Uuid::new_v4() }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn test_malformed_input_never_reaches_store() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.identity(UserRole::Admin).await;
    let sessions = ctx.store.sessions_opened();

    let bad_inputs = [
        ("fish.getOne", json!({ "id": "not-a-uuid" })),
        ("fish.getOne", Value::Null),
        ("fish.create", json!({ "scientificName": BETTA })),
        ("tank.create", json!({ "name": "", "type": "reef" })),
        ("tank.update", json!({ "id": Uuid::new_v4(), "name": "x", "type": "y" })),
        ("user.update", json!({ "id": Uuid::new_v4(), "role": "ROOT" })),
        ("fish.getAll", json!({ "unexpected": true })),
        ("tank.getAllGlobal", json!("everything")),
    ];

    for (op, input) in bad_inputs {
        let err = ctx.dispatcher.dispatch(op, &admin, input).await.unwrap_err();
        assert_eq!(err.code(), "validation_error", "{op}");
    }

    assert_eq!(ctx.store.sessions_opened(), sessions);
}

#[tokio::test]
async fn test_unknown_operation_is_validation_error() {
    let ctx = TestContext::new();

    let err = ctx
        .dispatcher
        .dispatch("aquarium.flood", &CallerIdentity::Anonymous, Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }));
    assert_eq!(ctx.store.sessions_opened(), 0);
}

#[tokio::test]
async fn test_gate_runs_before_input_validation() {
    let ctx = TestContext::new();

    let err = ctx
        .dispatcher
        .dispatch("user.update", &CallerIdentity::Anonymous, json!({ "bogus": 1 }))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Unauthorized));
}

#[tokio::test]
async fn test_store_outage_is_unavailable() {
    let ctx = TestContext::new();
    ctx.store.fail_on(tankkeeper_shared::store::FailPoint::Begin);

    let err = ctx
        .dispatcher
        .dispatch("tank.getAllGlobal", &CallerIdentity::Anonymous, Value::Null)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "unavailable");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_admit_resolves_and_gates_without_input() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.identity(UserRole::Admin).await;
    let sessions = ctx.store.sessions_opened();

    let err = ctx
        .dispatcher
        .admit("user.delete", &CallerIdentity::Anonymous)
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));

    let op = ctx.dispatcher.admit("users.delete", &admin).unwrap();
    assert_eq!(op, Operation::UserDelete);

    let err = ctx.dispatcher.admit("user.drop", &admin).unwrap_err();
    assert_eq!(err.code(), "validation_error");

    assert_eq!(ctx.store.sessions_opened(), sessions);
}
