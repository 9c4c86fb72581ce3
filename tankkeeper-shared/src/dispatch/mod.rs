/// Operation dispatcher
///
/// Maps an operation name and a JSON input to the tier gate and a handler:
///
/// 1. resolve the name to an [`Operation`] (unknown → `ValidationError`)
/// 2. check the caller against [`Operation::tier`] (→ `Unauthorized`)
/// 3. decode and validate the input (→ `ValidationError`)
/// 4. run the handler with the caller and the [`Repositories`]
///
/// The store is not touched before step 4, so a rejected call leaves no
/// trace.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use serde_json::json;
/// use tankkeeper_shared::auth::identity::CallerIdentity;
/// use tankkeeper_shared::dispatch::Dispatcher;
/// use tankkeeper_shared::repository::Repositories;
/// use tankkeeper_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher = Dispatcher::new(Repositories::new(Arc::new(MemoryStore::new())));
///
/// let tanks = dispatcher
///     .dispatch("tank.getAllGlobal", &CallerIdentity::Anonymous, json!(null))
///     .await?;
/// assert_eq!(tanks, json!([]));
/// # Ok(())
/// # }
/// ```

mod handlers;
pub mod input;
pub mod operation;

use serde_json::Value;
use tracing::debug;

use crate::auth::authorization::authorize;
use crate::auth::identity::CallerIdentity;
use crate::error::{CoreError, CoreResult};
use crate::repository::Repositories;

pub use operation::{Operation, UnknownOperation};

/// Stateless routing table over a repository set
#[derive(Debug, Clone)]
pub struct Dispatcher {
    repos: Repositories,
}

impl Dispatcher {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Runs `operation` on behalf of `identity`
    pub async fn dispatch(
        &self,
        operation: &str,
        identity: &CallerIdentity,
        input: Value,
    ) -> CoreResult<Value> {
        let op = self.admit(operation, identity)?;
        self.run(op, identity, input).await
    }

    /// Like [`Dispatcher::dispatch`] for an already resolved operation
    pub async fn dispatch_operation(
        &self,
        op: Operation,
        identity: &CallerIdentity,
        input: Value,
    ) -> CoreResult<Value> {
        gate(op, identity)?;
        self.run(op, identity, input).await
    }

    /// Resolves the operation name and checks the caller's tier
    ///
    /// Callers holding undecoded input run this before decoding it.
    pub fn admit(&self, operation: &str, identity: &CallerIdentity) -> CoreResult<Operation> {
        let op: Operation = operation
            .parse()
            .map_err(|e: UnknownOperation| CoreError::validation(e.to_string()))?;

        gate(op, identity)?;
        Ok(op)
    }

    async fn run(&self, op: Operation, identity: &CallerIdentity, input: Value) -> CoreResult<Value> {
        let call = handlers::Call::decode(op, input)?;

        debug!(operation = %op, caller = ?identity.user_id(), "Dispatching");
        call.run(identity, &self.repos).await
    }
}

fn gate(op: Operation, identity: &CallerIdentity) -> CoreResult<()> {
    authorize(identity, op.tier()).map_err(|e| {
        debug!(operation = %op, caller = ?identity.user_id(), error = %e, "Call rejected by tier gate");
        e.into()
    })
}
