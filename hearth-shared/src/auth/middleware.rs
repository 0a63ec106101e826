/// Identity resolution for Axum
///
/// The identity middleware inspects the `Authorization` header:
///
/// - no header: the request continues anonymously
/// - `Bearer <jwt>` with a valid token: an [`AuthContext`] is added to the
///   request extensions
/// - anything else: 401
///
/// Handlers that require a caller extract `AuthContext` directly (401 when
/// anonymous); handlers with optional auth extract `Option<AuthContext>`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use hearth_shared::auth::middleware::{create_identity_middleware, AuthContext};
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("user {} ({})", auth.user_id, auth.role.as_str())
/// }
///
/// async fn greet(auth: Option<AuthContext>) -> &'static str {
///     if auth.is_some() { "welcome back" } else { "hello stranger" }
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .route("/greet", get(greet))
///     .layer(middleware::from_fn(create_identity_middleware("secret".to_string())));
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::UserRole;

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Role carried by the token
    pub role: UserRole,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Resolves the caller from request headers
///
/// Returns `Ok(None)` when no `Authorization` header is present.
pub fn resolve_identity(headers: &HeaderMap, secret: &str) -> Result<Option<AuthContext>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Malformed Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(Some(AuthContext {
        user_id: claims.sub,
        role: claims.role,
    }))
}

/// Identity middleware
///
/// Attaches an [`AuthContext`] when a valid bearer token is present and
/// rejects requests carrying an invalid one.
pub async fn identity_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(context) = resolve_identity(req.headers(), &secret)? {
        tracing::trace!(user_id = %context.user_id, "Resolved caller identity");
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

/// Captures the JWT secret and returns a middleware function for
/// `axum::middleware::from_fn`
pub fn create_identity_middleware(
    secret: String,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    move |req, next| {
        let secret = secret.clone();
        Box::pin(identity_middleware(secret, req, next))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
