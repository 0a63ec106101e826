/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 session tokens
/// - [`middleware`]: Bearer-token identity resolution and the `AuthContext` extractor
/// - [`authorization`]: Role capabilities and recipe visibility
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use hearth_shared::auth::jwt::{create_token, Claims};
/// use hearth_shared::auth::password::{hash_password, verify_password};
/// use hearth_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::Member, Duration::hours(720));
/// let token = create_token(&claims, "a-secret-of-at-least-thirty-two-bytes!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
