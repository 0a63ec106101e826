/// Household membership endpoints
///
/// - `POST /api/household/invite` - Owner invites an existing user
/// - `GET /api/household/invites` - Owner lists the household's invitations
/// - `POST /api/household/join` - Invitee redeems a code
///
/// All three require a signed-in caller.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{required, Payload},
};
use axum::{extract::State, http::StatusCode, Json};
use hearth_shared::{
    auth::{
        authorization::{require_capability, Capability},
        middleware::AuthContext,
    },
    models::{
        household::Household,
        invitation::{generate_code, CreateInvitation, InvitationDetails, InviteeView, InviterView},
        user::{normalize_email, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub message: String,
    pub invite: InvitationDetails,
}

#[derive(Debug, Serialize)]
pub struct InvitationList {
    pub invitations: Vec<InvitationDetails>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: Option<String>,
}

/// Household as returned after joining
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinedHousehold {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub message: String,
    pub household: JoinedHousehold,
}

async fn load_caller(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn load_household(state: &AppState, id: Uuid) -> ApiResult<Household> {
    state
        .store
        .find_household(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Household not found".to_string()))
}

/// Invite a user into the caller's household
///
/// # Endpoint
///
/// ```text
/// POST /api/household/invite
/// Authorization: Bearer <token>
///
/// { "email": "sam@example.com", "phone": "+15550001111" }
/// ```
///
/// The invitee is matched by email OR phone.
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, invitee already in a household
/// - `401 Unauthorized`: No valid token
/// - `403 Forbidden`: Caller is not a household owner
/// - `404 Not Found`: Caller, household or invitee missing
/// - `409 Conflict`: Code collision
pub async fn invite(
    State(state): State<AppState>,
    auth: AuthContext,
    Payload(req): Payload<InviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteResponse>)> {
    const MISSING: &str = "Email and phone are required";
    let email = normalize_email(required(&req.email, MISSING)?);
    let phone = required(&req.phone, MISSING)?;

    let caller = load_caller(&state, &auth).await?;
    require_capability(caller.role, Capability::InviteMembers)?;
    let household_id = caller
        .household_id
        .ok_or_else(|| ApiError::Forbidden("You must own a household to invite members".to_string()))?;

    let household = load_household(&state, household_id).await?;
    if !household.is_owner(caller.id) {
        return Err(ApiError::Forbidden(
            "Only the household owner can invite members".to_string(),
        ));
    }

    let invitee = state
        .store
        .find_user_by_contact(&email, phone)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if invitee.household_id.is_some() {
        return Err(ApiError::BadRequest(
            "User already belongs to a household".to_string(),
        ));
    }

    let invitation = state
        .store
        .create_invitation(CreateInvitation {
            code: generate_code(),
            household_id: household.id,
            invited_by: caller.id,
            invited_user: invitee.id,
        })
        .await?;

    tracing::info!(
        invitation_id = %invitation.id,
        household_id = %household.id,
        invitee_id = %invitee.id,
        "Invitation created"
    );

    let details = InvitationDetails::new(
        invitation,
        Some(InviteeView {
            id: invitee.id,
            name: invitee.name,
            email: invitee.email,
            phone: invitee.phone,
        }),
        Some(InviterView {
            id: caller.id,
            name: caller.name,
        }),
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            message: "Invitation sent".to_string(),
            invite: details,
        }),
    ))
}

/// List invitations issued for the caller's household, newest first
///
/// # Errors
///
/// - `400 Bad Request`: Caller has no household
/// - `401 Unauthorized`: No valid token
/// - `403 Forbidden`: Caller is not an owner
/// - `404 Not Found`: Caller or household missing
pub async fn list_invites(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<InvitationList>> {
    let caller = load_caller(&state, &auth).await?;
    let household_id = caller
        .household_id
        .ok_or_else(|| ApiError::BadRequest("You do not belong to a household".to_string()))?;
    require_capability(caller.role, Capability::ViewInvitations)?;

    let household = load_household(&state, household_id).await?;
    let invitations = state.store.list_invitations(household.id).await?;

    Ok(Json(InvitationList { invitations }))
}

/// Redeem an invitation code
///
/// # Endpoint
///
/// ```text
/// POST /api/household/join
/// Authorization: Bearer <token>
///
/// { "code": "a1b2c3d4e5f6" }
/// ```
///
/// Marking the invitation accepted, adding the member and linking the user
/// happen atomically in the store.
///
/// # Errors
///
/// - `400 Bad Request`: Missing code, no matching pending invitation, caller
///   already in a household
/// - `401 Unauthorized`: No valid token
/// - `403 Forbidden`: Invitation addressed to someone else
/// - `404 Not Found`: Caller or household missing
pub async fn join(
    State(state): State<AppState>,
    auth: AuthContext,
    Payload(req): Payload<JoinRequest>,
) -> ApiResult<Json<JoinResponse>> {
    let code = required(&req.code, "Invitation code is required")?;

    let caller = load_caller(&state, &auth).await?;

    let invitation = state
        .store
        .find_pending_invitation(code, caller.id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired invitation code".to_string()))?;

    if invitation.invited_user != Some(caller.id) {
        return Err(ApiError::Forbidden(
            "This invitation is addressed to another user".to_string(),
        ));
    }
    if caller.household_id.is_some() {
        return Err(ApiError::BadRequest(
            "You already belong to a household".to_string(),
        ));
    }
    require_capability(caller.role, Capability::JoinHousehold)?;

    load_household(&state, invitation.household_id).await?;
    let household = state.store.accept_invitation(invitation.id, caller.id).await?;

    tracing::info!(
        household_id = %household.id,
        user_id = %caller.id,
        "User joined household"
    );

    Ok(Json(JoinResponse {
        message: "Joined household".to_string(),
        household: JoinedHousehold {
            id: household.id,
            name: household.name,
            members: household.members,
        },
    }))
}
