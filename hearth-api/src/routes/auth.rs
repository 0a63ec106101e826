/// Authentication endpoints
///
/// - `POST /api/auth/register` - Create an account (and a household for owners)
/// - `POST /api/auth/login` - Exchange email + password for a session token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{required, Payload},
};
use axum::{extract::State, http::StatusCode, Json};
use hearth_shared::{
    auth::{jwt, password},
    models::user::{compose_phone, is_valid_phone, normalize_email, CreateUser, UserRole},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Register request
///
/// Every field is optional at the wire level so that missing values get the
/// same 400 as blank ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Country calling code, with or without the leading `+`
    pub phone_code: Option<String>,

    /// Local part of the phone number
    pub phone: Option<String>,

    pub email: Option<String>,

    pub password: Option<String>,

    pub name: Option<String>,

    /// "owner", "member" or "admin"; member when omitted
    pub role: Option<String>,
}

/// Normalized account fields, checked after trimming
#[derive(Debug, Validate)]
struct NewAccount {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    name: String,

    #[validate(email(message = "Invalid email format"))]
    email: String,

    #[validate(custom(function = "validate_phone"))]
    phone: String,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must be in international format".into());
        Err(err)
    }
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,

    pub user_id: Uuid,

    /// Set when the account registered as a household owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_id: Option<Uuid>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,

    pub role: UserRole,

    pub access_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Seconds until the access token expires
    pub expires_in: i64,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "phoneCode": "+1",
///   "phone": "5551234567",
///   "email": "jane@example.com",
///   "password": "correct horse",
///   "name": "Jane",
///   "role": "owner"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "message": "User created successfully",
///   "userId": "uuid",
///   "householdId": "uuid"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, bad email or phone, unknown role
/// - `409 Conflict`: Email or phone already registered
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    Payload(req): Payload<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    const MISSING: &str = "Phone, phone code, password and name are required";

    let phone_code = required(&req.phone_code, MISSING)?;
    let phone = required(&req.phone, MISSING)?;
    let name = required(&req.name, MISSING)?;
    required(&req.password, MISSING)?;
    let email = required(&req.email, "Email is required")?;

    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => UserRole::default(),
        Some(raw) => UserRole::parse(&raw.to_lowercase())
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid role: {}", raw)))?,
    };

    let account = NewAccount {
        name: name.to_string(),
        email: normalize_email(email),
        phone: compose_phone(phone_code, phone),
    };
    account.validate()?;

    if state
        .store
        .find_user_by_contact(&account.email, &account.phone)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    // Blank passwords were rejected above; the raw value is what gets hashed
    let password_hash = password::hash_blocking(req.password.unwrap_or_default()).await?;

    let registration = state
        .store
        .register_user(
            CreateUser {
                name: account.name,
                email: account.email,
                phone: account.phone,
                password_hash,
                role,
            },
            role == UserRole::Owner,
        )
        .await?;

    let household_id = registration.household.as_ref().map(|h| h.id);
    tracing::info!(
        user_id = %registration.user.id,
        role = role.as_str(),
        household_id = ?household_id,
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id: registration.user.id,
            household_id,
        }),
    ))
}

/// Log in with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "jane@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "userId": "uuid",
///   "role": "owner",
///   "accessToken": "eyJ...",
///   "tokenType": "Bearer",
///   "expiresIn": 2592000
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account inactive or banned
pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    const MISSING: &str = "Email and password are required";

    let email = normalize_email(required(&req.email, MISSING)?);
    required(&req.password, MISSING)?;

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_blocking(req.password.unwrap_or_default(), user.password_hash.clone())
        .await?;
    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active() {
        return Err(ApiError::Forbidden("Account is not active".to_string()));
    }

    let claims = jwt::Claims::new(user.id, user.role, state.token_ttl());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        role: user.role,
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: claims.expires_in_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(phone: &str, email: &str) -> NewAccount {
        NewAccount {
            name: "Jane".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn test_account_validation() {
        assert!(account("+15551234567", "jane@example.com").validate().is_ok());

        let errors = account("+0123", "not-an-email").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_register_request_is_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"phoneCode":"1","phone":"5551234567","email":"a@b.co","password":"pw","name":"A"}"#,
        )
        .unwrap();
        assert_eq!(req.phone_code.as_deref(), Some("1"));
        assert!(req.role.is_none());
    }
}
