/// Caller identity middleware
///
/// Resolves the optional `Authorization: Bearer <token>` header into a
/// [`CallerIdentity`] and stores it in the request extensions. The layer
/// never rejects a request: a missing, malformed, forged or expired token
/// simply yields `Anonymous`, and the tier gate decides what that caller may
/// do.
///
/// With `USERS_AUTO_PROVISION` on, a verified subject that has no user
/// record yet gets one (role USER) and is then looked up again. Known users
/// never open a write session here.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tankkeeper_shared::auth::identity::CallerIdentity;
use tracing::{debug, warn};

use crate::app::AppState;

/// Extracts the bearer token, if the header carries one
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();

    (!token.is_empty()).then_some(token)
}

/// Resolves the caller and inserts it into the request extensions
pub async fn resolve_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = identify(&state, req.headers()).await;
    debug!(caller = ?identity.user_id(), "Caller resolved");

    req.extensions_mut().insert(identity);
    next.run(req).await
}

async fn identify(state: &AppState, headers: &HeaderMap) -> CallerIdentity {
    let Some(token) = bearer_token(headers) else {
        if headers.contains_key(header::AUTHORIZATION) {
            debug!("Authorization header is not a bearer token, treating caller as anonymous");
        }
        return CallerIdentity::Anonymous;
    };

    let Some(user_id) = state.resolver.verify_token(token) else {
        return CallerIdentity::Anonymous;
    };

    let identity = state.resolver.resolve_subject(user_id).await;
    if !identity.is_anonymous() || !state.config.users.auto_provision {
        return identity;
    }

    if let Err(e) = state.dispatcher.repositories().users().provision(user_id).await {
        warn!(%user_id, error = %e, "User provisioning failed");
        return CallerIdentity::Anonymous;
    }

    state.resolver.resolve_subject(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_non_bearer_headers() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
    }
}
