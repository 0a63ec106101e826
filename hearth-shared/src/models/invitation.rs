/// Invitation model and database operations
///
/// An invitation links a household, the owner who issued it and the invitee.
/// Status moves one way: `pending` to `accepted`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     code VARCHAR(32) NOT NULL UNIQUE,
///     household_id UUID NOT NULL REFERENCES households(id),
///     invited_by UUID NOT NULL REFERENCES users(id),
///     invited_user UUID REFERENCES users(id),
///     status invitation_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Random bytes per invitation code (hex-encoded to twice as many chars)
pub const CODE_BYTES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,

    pub code: String,

    #[serde(rename = "household")]
    pub household_id: Uuid,

    pub invited_by: Uuid,

    /// Cleared if the invitee account is deleted
    pub invited_user: Option<Uuid>,

    pub status: InvitationStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub code: String,
    pub household_id: Uuid,
    pub invited_by: Uuid,
    pub invited_user: Uuid,
}

/// Invitee shown in invitation listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteeView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Inviter shown in invitation listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviterView {
    pub id: Uuid,
    pub name: String,
}

/// Invitation with its referenced users resolved for display
///
/// A reference whose user no longer exists is `None`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDetails {
    pub id: Uuid,
    pub code: String,
    pub household: Uuid,
    pub status: InvitationStatus,
    pub invited_user: Option<InviteeView>,
    pub invited_by: Option<InviterView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvitationDetails {
    pub fn new(
        invitation: Invitation,
        invited_user: Option<InviteeView>,
        invited_by: Option<InviterView>,
    ) -> Self {
        Self {
            id: invitation.id,
            code: invitation.code,
            household: invitation.household_id,
            status: invitation.status,
            invited_user,
            invited_by,
            created_at: invitation.created_at,
            updated_at: invitation.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailsRow {
    #[sqlx(flatten)]
    invitation: Invitation,
    invitee_id: Option<Uuid>,
    invitee_name: Option<String>,
    invitee_email: Option<String>,
    invitee_phone: Option<String>,
    inviter_id: Option<Uuid>,
    inviter_name: Option<String>,
}

impl From<DetailsRow> for InvitationDetails {
    fn from(row: DetailsRow) -> Self {
        let invitee = match (row.invitee_id, row.invitee_name, row.invitee_email, row.invitee_phone) {
            (Some(id), Some(name), Some(email), Some(phone)) => Some(InviteeView {
                id,
                name,
                email,
                phone,
            }),
            _ => None,
        };
        let inviter = match (row.inviter_id, row.inviter_name) {
            (Some(id), Some(name)) => Some(InviterView { id, name }),
            _ => None,
        };

        InvitationDetails::new(row.invitation, invitee, inviter)
    }
}

/// Generates a fresh invitation code: 12 lowercase hex chars
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Invitation {
    /// Creates a pending invitation
    ///
    /// # Errors
    ///
    /// A duplicate code violates `invitations_code_key`.
    pub async fn create<'e, E>(executor: E, data: CreateInvitation) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (code, household_id, invited_by, invited_user)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, household_id, invited_by, invited_user, status, created_at, updated_at
            "#,
        )
        .bind(data.code)
        .bind(data.household_id)
        .bind(data.invited_by)
        .bind(data.invited_user)
        .fetch_one(executor)
        .await
    }

    /// Finds a pending invitation with this code addressed to this user
    pub async fn find_pending<'e, E>(
        executor: E,
        code: &str,
        invited_user: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, code, household_id, invited_by, invited_user, status, created_at, updated_at
            FROM invitations
            WHERE code = $1 AND invited_user = $2 AND status = 'pending'
            "#,
        )
        .bind(code)
        .bind(invited_user)
        .fetch_optional(executor)
        .await
    }

    /// Moves a pending invitation to accepted
    ///
    /// Returns false if the invitation was no longer pending.
    pub async fn mark_accepted<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lists a household's invitations, newest first, with users resolved
    pub async fn list_for_household<'e, E>(
        executor: E,
        household_id: Uuid,
    ) -> Result<Vec<InvitationDetails>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, DetailsRow>(
            r#"
            SELECT i.id, i.code, i.household_id, i.invited_by, i.invited_user, i.status,
                   i.created_at, i.updated_at,
                   invitee.id AS invitee_id, invitee.name AS invitee_name,
                   invitee.email AS invitee_email, invitee.phone AS invitee_phone,
                   inviter.id AS inviter_id, inviter.name AS inviter_name
            FROM invitations i
            LEFT JOIN users invitee ON invitee.id = i.invited_user
            LEFT JOIN users inviter ON inviter.id = i.invited_by
            WHERE i.household_id = $1
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(household_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(InvitationDetails::from).collect())
    }
}
