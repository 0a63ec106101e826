/// Household model and database operations
///
/// A household is a group of users sharing recipes. The owner is always one
/// of its members and every member appears at most once.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE households (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     members UUID[] NOT NULL DEFAULT '{}',
///     status household_status NOT NULL DEFAULT 'active',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT households_owner_is_member CHECK (owner_id = ANY(members))
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "household_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HouseholdStatus {
    #[default]
    Active,
    Inactive,
}

/// A household and its member list
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: Uuid,

    pub name: String,

    #[serde(rename = "owner")]
    pub owner_id: Uuid,

    /// Member user IDs, owner included
    pub members: Vec<Uuid>,

    pub status: HouseholdStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a household; the owner becomes its first member
#[derive(Debug, Clone)]
pub struct CreateHousehold {
    pub name: String,
    pub owner_id: Uuid,
}

impl CreateHousehold {
    /// Default household for a freshly registered owner
    pub fn for_owner(owner_name: &str, owner_id: Uuid) -> Self {
        Self {
            name: format!("{}'s Household", owner_name),
            owner_id,
        }
    }
}

impl Household {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Owner or listed member
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.has_member(user_id)
    }

    /// Creates a household with the owner as sole member
    pub async fn create<'e, E>(executor: E, data: CreateHousehold) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Household>(
            r#"
            INSERT INTO households (name, owner_id, members)
            VALUES ($1, $2, ARRAY[$2]::UUID[])
            RETURNING id, name, owner_id, members, status, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.owner_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Household>(
            r#"
            SELECT id, name, owner_id, members, status, created_at, updated_at
            FROM households
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Adds a member, leaving the list untouched if already present
    ///
    /// Returns the updated household, or None if it doesn't exist.
    pub async fn add_member<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Household>(
            r#"
            UPDATE households
            SET members = CASE
                    WHEN $2 = ANY(members) THEN members
                    ELSE array_append(members, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, owner_id, members, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }
}
