/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: HS256 token issuing and validation
/// - [`middleware`]: Axum middleware and the [`middleware::AuthContext`] extractor
/// - [`authorization`]: Ownership checks
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use recipebook_shared::auth::jwt::{issue_token, validate_token};
/// use recipebook_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let secret = "your-secret-key-at-least-32-bytes-long";
/// let token = issue_token(1, Duration::hours(24), secret)?;
/// assert_eq!(validate_token(&token, secret)?.user_id()?, 1);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
