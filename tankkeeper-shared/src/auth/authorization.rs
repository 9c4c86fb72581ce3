/// Access tier gate
///
/// Every operation declares the minimum [`AccessTier`] it needs. The gate
/// compares it with the caller's effective tier before anything else runs.
///
/// # Tier Model
///
/// Tiers are totally ordered, and a higher tier satisfies every lower one:
///
/// 1. **Public**: any caller, including anonymous
/// 2. **User**: any resolved user, whatever their role
/// 3. **Admin**: users whose role is ADMIN
///
/// # Example
///
/// ```
/// use tankkeeper_shared::auth::authorization::{authorize, AccessTier};
/// use tankkeeper_shared::auth::identity::CallerIdentity;
/// use tankkeeper_shared::models::UserRole;
/// use uuid::Uuid;
///
/// let admin = CallerIdentity::user(Uuid::new_v4(), UserRole::Admin);
/// assert!(authorize(&admin, AccessTier::User).is_ok());
///
/// assert!(authorize(&CallerIdentity::Anonymous, AccessTier::User).is_err());
/// ```

use std::fmt;

use serde::Serialize;

use super::identity::CallerIdentity;
use crate::models::UserRole;

/// Error type for tier checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's tier is below the requirement
    #[error("Insufficient tier: requires {required}, has {actual}")]
    InsufficientTier {
        required: AccessTier,
        actual: AccessTier,
    },
}

/// Minimum privilege an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessTier {
    Public,
    User,
    Admin,
}

impl AccessTier {
    /// Tier granted by a stored role
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::User => AccessTier::User,
            UserRole::Admin => AccessTier::Admin,
        }
    }

    /// Tier a caller holds
    pub fn of(identity: &CallerIdentity) -> Self {
        match identity {
            CallerIdentity::Anonymous => AccessTier::Public,
            CallerIdentity::User { role, .. } => AccessTier::for_role(*role),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Public => "PUBLIC",
            AccessTier::User => "USER",
            AccessTier::Admin => "ADMIN",
        }
    }

    /// Whether holding `self` meets `required`
    pub fn satisfies(&self, required: AccessTier) -> bool {
        *self >= required
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks `identity` against `required`
///
/// # Errors
///
/// Returns [`AuthzError::InsufficientTier`] when the caller's tier is lower
/// than `required`.
pub fn authorize(identity: &CallerIdentity, required: AccessTier) -> Result<(), AuthzError> {
    let actual = AccessTier::of(identity);

    if !actual.satisfies(required) {
        return Err(AuthzError::InsufficientTier { required, actual });
    }

    Ok(())
}
