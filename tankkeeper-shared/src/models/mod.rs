/// Domain models for Tankkeeper
///
/// # Models
///
/// - `user`: User accounts and roles
/// - `tank`: Tanks, each owned by exactly one user
/// - `fish`: Fish, each living in zero or one tank
///
/// Models are plain data. Persistence goes through [`crate::store`], and the
/// rules that keep the user → tank → fish graph consistent live in
/// [`crate::consistency`].

pub mod fish;
pub mod tank;
pub mod user;

pub use fish::{Fish, FishChanges, FishFields, NewFish};
pub use tank::{NewTank, Tank, TankChanges};
pub use user::{User, UserRole};
