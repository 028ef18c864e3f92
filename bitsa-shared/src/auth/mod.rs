/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: Access/refresh token issuing and validation
/// - [`middleware`]: Bearer token authentication for incoming requests
/// - [`authorization`]: The owner-or-staff policy shared by every content type
/// - [`identity`]: Username-or-email login resolution
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::auth::password::{hash_password, verify_password};
/// use bitsa_shared::auth::jwt::{TokenPair, TokenTtl};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let tokens = TokenPair::issue(42, "secret-key-with-at-least-32-bytes", TokenTtl::default())?;
/// assert_ne!(tokens.access, tokens.refresh);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
