//! Operation handlers
//!
//! [`Call`] is a decoded operation: the variant says which handler runs and
//! carries its typed input. Handlers receive the caller and the repository
//! set explicitly.

use serde::Serialize;
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use super::input::{
    decode, FishCreateInput, FishUpdateInput, IdInput, NoInput, TankCreateInput, TankIdInput,
    TankUpdateInput, UserIdInput, UserRoleInput,
};
use super::operation::Operation;
use crate::auth::identity::CallerIdentity;
use crate::error::{CoreError, CoreResult};
use crate::models::Tank;
use crate::repository::Repositories;

pub(super) enum Call {
    FishGetAll,
    FishGetOne(IdInput),
    FishCreate(FishCreateInput),
    FishUpdate(FishUpdateInput),
    FishDelete(IdInput),
    FishGetByTank(TankIdInput),
    FishGetByUser(UserIdInput),
    TankGetAllGlobal,
    TankGetAllByUser(UserIdInput),
    TankGetOne(IdInput),
    TankCreate(TankCreateInput),
    TankUpdate(TankUpdateInput),
    TankDelete(IdInput),
    UserGetAll,
    UserGetOne(IdInput),
    UserCreate,
    UserUpdate(UserRoleInput),
    UserDelete(IdInput),
    UserPromote(IdInput),
    UserDemote(IdInput),
}

impl Call {
    pub(super) fn decode(op: Operation, input: Value) -> CoreResult<Self> {
        let call = match op {
            Operation::FishGetAll => {
                decode::<NoInput>(input)?;
                Call::FishGetAll
            }
            Operation::FishGetOne => Call::FishGetOne(decode(input)?),
            Operation::FishCreate => Call::FishCreate(decode(input)?),
            Operation::FishUpdate => Call::FishUpdate(decode(input)?),
            Operation::FishDelete => Call::FishDelete(decode(input)?),
            Operation::FishGetByTank => Call::FishGetByTank(decode(input)?),
            Operation::FishGetByUser => Call::FishGetByUser(decode(input)?),
            Operation::TankGetAllGlobal => {
                decode::<NoInput>(input)?;
                Call::TankGetAllGlobal
            }
            Operation::TankGetAllByUser => Call::TankGetAllByUser(decode(input)?),
            Operation::TankGetOne => Call::TankGetOne(decode(input)?),
            Operation::TankCreate => Call::TankCreate(decode(input)?),
            Operation::TankUpdate => Call::TankUpdate(decode(input)?),
            Operation::TankDelete => Call::TankDelete(decode(input)?),
            Operation::UserGetAll => {
                decode::<NoInput>(input)?;
                Call::UserGetAll
            }
            Operation::UserGetOne => Call::UserGetOne(decode(input)?),
            // Whatever the caller sends, a new user always starts as USER
            Operation::UserCreate => Call::UserCreate,
            Operation::UserUpdate => Call::UserUpdate(decode(input)?),
            Operation::UserDelete => Call::UserDelete(decode(input)?),
            Operation::UserPromote => Call::UserPromote(decode(input)?),
            Operation::UserDemote => Call::UserDemote(decode(input)?),
        };

        Ok(call)
    }

    pub(super) async fn run(self, identity: &CallerIdentity, repos: &Repositories) -> CoreResult<Value> {
        match self {
            Call::FishGetAll => to_json(repos.fish().get_all().await?),
            Call::FishGetOne(input) => to_json(repos.fish().get_one(input.id).await?),
            Call::FishCreate(input) => to_json(repos.fish().create(input.into()).await?),
            Call::FishUpdate(input) => {
                let (id, fields) = input.into_parts();
                to_json(repos.fish().update(id, fields).await?)
            }
            Call::FishDelete(input) => to_json(repos.fish().delete(input.id).await?),
            Call::FishGetByTank(input) => to_json(repos.fish().get_by_tank(input.tank_id).await?),
            Call::FishGetByUser(input) => {
                to_json(repos.relationships().fish_inventory(input.user_id).await?)
            }

            Call::TankGetAllGlobal => to_json(repos.tanks().get_all().await?),
            Call::TankGetAllByUser(input) => to_json(repos.tanks().get_by_user(input.user_id).await?),
            Call::TankGetOne(input) => to_json(repos.tanks().get_one(input.id).await?),
            Call::TankCreate(input) => to_json(create_tank(identity, repos, input).await?),
            Call::TankUpdate(input) => to_json(repos.relationships().update_tank(input.into()).await?),
            Call::TankDelete(input) => to_json(repos.relationships().delete_tank(input.id).await?),

            Call::UserGetAll => to_json(repos.users().get_all().await?),
            Call::UserGetOne(input) => to_json(repos.users().get_one(input.id).await?),
            Call::UserCreate => to_json(repos.users().create().await?),
            Call::UserUpdate(input) => to_json(repos.users().update(input.id, input.role).await?),
            Call::UserDelete(input) => to_json(repos.users().delete(input.id).await?),
            Call::UserPromote(input) => to_json(repos.users().promote(input.id).await?),
            Call::UserDemote(input) => to_json(repos.users().demote(input.id).await?),
        }
    }
}

/// The caller becomes the owner
async fn create_tank(
    identity: &CallerIdentity,
    repos: &Repositories,
    input: TankCreateInput,
) -> CoreResult<Tank> {
    let owner_id: Uuid = identity.user_id().ok_or(CoreError::Unauthorized)?;
    repos.tanks().create(owner_id, input.name, input.tank_type).await
}

fn to_json<T: Serialize>(value: T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        error!(error = %e, "Failed to serialize operation result");
        CoreError::Internal
    })
}
