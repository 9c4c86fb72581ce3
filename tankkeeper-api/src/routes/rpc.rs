/// Operation endpoint
///
/// Every catalogue operation is reachable through one route:
///
/// ```text
/// POST /v1/rpc/:operation
/// Authorization: Bearer <token>   (optional)
/// Content-Type: application/json
///
/// { ...operation input... }
/// ```
///
/// An empty body means "no input". The response is the operation's JSON
/// result with `200`, or an [`ErrorResponse`](crate::error::ErrorResponse)
/// carrying the failure code.
///
/// # Example
///
/// ```text
/// POST /v1/rpc/fish.getByUser
/// {"userId": "6f1c..."}
///
/// 200 {"Betta splendens": 2}
/// ```

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use bytes::Bytes;
use serde_json::Value;
use tankkeeper_shared::auth::identity::CallerIdentity;
use tankkeeper_shared::error::CoreError;

use crate::{app::AppState, error::ApiResult};

/// Runs an operation on behalf of the resolved caller
///
/// The tier gate runs before the body is decoded.
pub async fn call_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Extension(identity): Extension<CallerIdentity>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();

    match run_operation(&state, &operation, &identity, &body).await {
        Ok(result) => {
            tracing::info!(
                operation = %operation,
                caller = ?identity.user_id(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Operation completed"
            );
            Ok(Json(result))
        }
        Err(e) => {
            tracing::info!(
                operation = %operation,
                caller = ?identity.user_id(),
                code = e.code(),
                "Operation failed"
            );
            Err(e.into())
        }
    }
}

async fn run_operation(
    state: &AppState,
    operation: &str,
    identity: &CallerIdentity,
    body: &[u8],
) -> Result<Value, CoreError> {
    let op = state.dispatcher.admit(operation, identity)?;
    let input = parse_input(body)?;

    state.dispatcher.dispatch_operation(op, identity, input).await
}

/// Decodes the request body; empty means no input
fn parse_input(body: &[u8]) -> Result<Value, CoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(body)?)
}
