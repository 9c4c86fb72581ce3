/// Caller identity and access control
///
/// # Modules
///
/// - [`jwt`]: HS256 session token creation and validation
/// - [`identity`]: token → [`identity::CallerIdentity`], failing closed
/// - [`authorization`]: the access tier gate
///
/// # Example
///
/// ```
/// use tankkeeper_shared::auth::authorization::{authorize, AccessTier};
/// use tankkeeper_shared::auth::identity::CallerIdentity;
/// use tankkeeper_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-32-characters!!";
/// let token = create_token(&Claims::new(Uuid::new_v4()), secret)?;
/// assert!(validate_token(&token, secret).is_ok());
///
/// assert!(authorize(&CallerIdentity::Anonymous, AccessTier::Public).is_ok());
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod jwt;
