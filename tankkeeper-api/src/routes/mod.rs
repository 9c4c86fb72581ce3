/// API route handlers
///
/// - `health`: Health check endpoint
/// - `rpc`: Operation catalogue endpoint

pub mod health;
pub mod rpc;
