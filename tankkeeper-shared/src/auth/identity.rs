/// Identity context resolution
///
/// Turns the bearer token of an inbound call into a [`CallerIdentity`]. The
/// token only proves *who* the caller is; their role is looked up in the
/// store so that promotions and demotions apply on the next call.
///
/// Resolution fails closed: a missing, malformed, expired or forged token,
/// an unknown subject, or a store failure all produce
/// [`CallerIdentity::Anonymous`]. Nothing is written.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tankkeeper_shared::auth::identity::{CallerIdentity, IdentityResolver};
/// use tankkeeper_shared::store::MemoryStore;
///
/// # async fn example() {
/// let resolver = IdentityResolver::new(Arc::new(MemoryStore::new()), "a-secret-of-at-least-32-characters!!");
/// let identity = resolver.resolve(Some("not-a-jwt")).await;
/// assert_eq!(identity, CallerIdentity::Anonymous);
/// # }
/// ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::{self, JwtError};
use crate::models::UserRole;
use crate::store::DataStore;

/// The resolved principal of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CallerIdentity {
    Anonymous,
    #[serde(rename_all = "camelCase")]
    User { user_id: Uuid, role: UserRole },
}

impl CallerIdentity {
    pub fn user(user_id: Uuid, role: UserRole) -> Self {
        CallerIdentity::User { user_id, role }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::User { user_id, .. } => Some(*user_id),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, CallerIdentity::Anonymous)
    }
}

/// Resolves bearer tokens against the session secret and the user store
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn DataStore>,
    secret: String,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn DataStore>, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    /// Verifies a token and returns its subject
    ///
    /// Returns `None` for any invalid token.
    pub fn verify_token(&self, token: &str) -> Option<Uuid> {
        match jwt::validate_token(token, &self.secret) {
            Ok(claims) => Some(claims.sub),
            Err(JwtError::Expired) => {
                debug!("Session token expired");
                None
            }
            Err(e) => {
                warn!(error = %e, "Rejected session token");
                None
            }
        }
    }

    /// Looks up the stored role of a verified subject
    pub async fn resolve_subject(&self, user_id: Uuid) -> CallerIdentity {
        let mut session = match self.store.begin().await {
            Ok(session) => session,
            Err(e) => {
                warn!(%user_id, error = %e, "Identity lookup failed, treating caller as anonymous");
                return CallerIdentity::Anonymous;
            }
        };

        match session.find_user(user_id).await {
            Ok(Some(user)) => CallerIdentity::user(user.id, user.role),
            Ok(None) => {
                debug!(%user_id, "Token subject has no user record");
                CallerIdentity::Anonymous
            }
            Err(e) => {
                warn!(%user_id, error = %e, "Identity lookup failed, treating caller as anonymous");
                CallerIdentity::Anonymous
            }
        }
    }

    /// Resolves an optional bearer token
    pub async fn resolve(&self, token: Option<&str>) -> CallerIdentity {
        let Some(token) = token else {
            return CallerIdentity::Anonymous;
        };

        match self.verify_token(token) {
            Some(user_id) => self.resolve_subject(user_id).await,
            None => CallerIdentity::Anonymous,
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}
