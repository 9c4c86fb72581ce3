//! Operation catalogue
//!
//! Every callable operation, its dotted name and the tier it requires.
//! Older router names (`tank.getOneTank`, `user.promoteToAdmin`, the
//! `tanks.` / `users.` prefixes, ...) resolve to the same entries.

use std::fmt;
use std::str::FromStr;

use crate::auth::authorization::AccessTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FishGetAll,
    FishGetOne,
    FishCreate,
    FishUpdate,
    FishDelete,
    FishGetByTank,
    FishGetByUser,
    TankGetAllGlobal,
    TankGetAllByUser,
    TankGetOne,
    TankCreate,
    TankUpdate,
    TankDelete,
    UserGetAll,
    UserGetOne,
    UserCreate,
    UserUpdate,
    UserDelete,
    UserPromote,
    UserDemote,
}

impl Operation {
    pub const ALL: [Operation; 20] = [
        Operation::FishGetAll,
        Operation::FishGetOne,
        Operation::FishCreate,
        Operation::FishUpdate,
        Operation::FishDelete,
        Operation::FishGetByTank,
        Operation::FishGetByUser,
        Operation::TankGetAllGlobal,
        Operation::TankGetAllByUser,
        Operation::TankGetOne,
        Operation::TankCreate,
        Operation::TankUpdate,
        Operation::TankDelete,
        Operation::UserGetAll,
        Operation::UserGetOne,
        Operation::UserCreate,
        Operation::UserUpdate,
        Operation::UserDelete,
        Operation::UserPromote,
        Operation::UserDemote,
    ];

    /// Canonical dotted name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::FishGetAll => "fish.getAll",
            Operation::FishGetOne => "fish.getOne",
            Operation::FishCreate => "fish.create",
            Operation::FishUpdate => "fish.update",
            Operation::FishDelete => "fish.delete",
            Operation::FishGetByTank => "fish.getByTank",
            Operation::FishGetByUser => "fish.getByUser",
            Operation::TankGetAllGlobal => "tank.getAllGlobal",
            Operation::TankGetAllByUser => "tank.getAllByUser",
            Operation::TankGetOne => "tank.getOne",
            Operation::TankCreate => "tank.create",
            Operation::TankUpdate => "tank.update",
            Operation::TankDelete => "tank.delete",
            Operation::UserGetAll => "user.getAll",
            Operation::UserGetOne => "user.getOne",
            Operation::UserCreate => "user.create",
            Operation::UserUpdate => "user.update",
            Operation::UserDelete => "user.delete",
            Operation::UserPromote => "user.promote",
            Operation::UserDemote => "user.demote",
        }
    }

    /// Minimum tier a caller needs
    pub fn tier(&self) -> AccessTier {
        match self {
            Operation::FishGetAll
            | Operation::FishGetOne
            | Operation::FishGetByTank
            | Operation::FishGetByUser
            | Operation::TankGetAllGlobal
            | Operation::TankGetAllByUser
            | Operation::TankGetOne
            | Operation::UserCreate => AccessTier::Public,

            Operation::TankCreate | Operation::TankUpdate | Operation::TankDelete => {
                AccessTier::User
            }

            Operation::FishCreate
            | Operation::FishUpdate
            | Operation::FishDelete
            | Operation::UserGetAll
            | Operation::UserGetOne
            | Operation::UserUpdate
            | Operation::UserDelete
            | Operation::UserPromote
            | Operation::UserDemote => AccessTier::Admin,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownOperation(s.to_string());
        let (namespace, method) = s.split_once('.').ok_or_else(unknown)?;

        let op = match (namespace, method) {
            ("fish", "getAll") => Operation::FishGetAll,
            ("fish", "getOne") => Operation::FishGetOne,
            ("fish", "create") => Operation::FishCreate,
            ("fish", "update") => Operation::FishUpdate,
            ("fish", "delete") => Operation::FishDelete,
            ("fish", "getByTank" | "getFishByTank") => Operation::FishGetByTank,
            ("fish", "getByUser" | "getFishByUser") => Operation::FishGetByUser,

            ("tank" | "tanks", "getAllGlobal" | "getAllTanksGlobal") => Operation::TankGetAllGlobal,
            ("tank" | "tanks", "getAllByUser" | "getAllTanksByUser") => Operation::TankGetAllByUser,
            ("tank" | "tanks", "getOne" | "getOneTank") => Operation::TankGetOne,
            ("tank" | "tanks", "create" | "createTank") => Operation::TankCreate,
            ("tank" | "tanks", "update" | "updateTank") => Operation::TankUpdate,
            ("tank" | "tanks", "delete" | "deleteTank") => Operation::TankDelete,

            ("user" | "users", "getAll") => Operation::UserGetAll,
            ("user" | "users", "getOne") => Operation::UserGetOne,
            ("user" | "users", "create") => Operation::UserCreate,
            ("user" | "users", "update") => Operation::UserUpdate,
            ("user" | "users", "delete") => Operation::UserDelete,
            ("user" | "users", "promote" | "promoteToAdmin") => Operation::UserPromote,
            ("user" | "users", "demote" | "demoteToUser") => Operation::UserDemote,

            _ => return Err(unknown()),
        };

        Ok(op)
    }
}
