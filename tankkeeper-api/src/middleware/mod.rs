/// Middleware modules for the API server
///
/// - `identity`: Bearer token to caller identity, with first-contact provisioning
/// - `security`: Security response headers

pub mod identity;
pub mod security;
