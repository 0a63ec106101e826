/// User model and database operations
///
/// Users register with a phone number and email address, both unique across
/// the store. A user belongs to at most one household.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(320) NOT NULL UNIQUE,
///     phone VARCHAR(16) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     profile_img TEXT,
///     role user_role NOT NULL DEFAULT 'member',
///     status user_status NOT NULL DEFAULT 'active',
///     household_id UUID REFERENCES households(id),
///     diet_type diet_type NOT NULL DEFAULT 'none',
///     allergies TEXT[] NOT NULL DEFAULT '{}',
///     disliked_ingredients TEXT[] NOT NULL DEFAULT '{}',
///     favorite_recipes UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use hearth_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Asha".to_string(),
///     email: "asha@example.com".to_string(),
///     phone: "+919812345678".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
/// }).await?;
///
/// let found = User::find_by_contact(&pool, "asha@example.com", "+919812345678").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use sqlx::PgExecutor;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, profile_img, role, status, \
     household_id, diet_type, allergies, disliked_ingredients, favorite_recipes, \
     created_at, updated_at";

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Owns a household and may invite others into it
    Owner,

    /// Regular account
    #[default]
    Member,

    /// Platform administrator
    Admin,
}

impl UserRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Member => "member",
            UserRole::Admin => "admin",
        }
    }

    /// Parses a role from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(UserRole::Owner),
            "member" => Some(UserRole::Member),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

/// Diet classification shared by user preferences and recipe diet tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "diet_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DietType {
    Vegetarian,
    Vegan,
    Keto,
    Paleo,
    Balanced,
    #[default]
    None,
}

impl DietType {
    /// Parses a diet type from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vegetarian" => Some(DietType::Vegetarian),
            "vegan" => Some(DietType::Vegan),
            "keto" => Some(DietType::Keto),
            "paleo" => Some(DietType::Paleo),
            "balanced" => Some(DietType::Balanced),
            "none" => Some(DietType::None),
            _ => None,
        }
    }
}

impl PgHasArrayType for DietType {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_diet_type")
    }
}

/// Dietary preferences owned by a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub diet_type: DietType,
    pub allergies: Vec<String>,
    pub disliked_ingredients: Vec<String>,
}

/// Items a user has bookmarked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorites {
    #[sqlx(rename = "favorite_recipes")]
    pub recipes: Vec<Uuid>,
}

/// User account
///
/// The password hash never leaves the server: it is skipped on serialization.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Normalized (trimmed, lowercase) email address
    pub email: String,

    /// Full E.164 phone number, country code included
    pub phone: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub profile_img: Option<String>,

    pub role: UserRole,

    pub status: UserStatus,

    /// Household this user belongs to, if any
    #[serde(rename = "household")]
    pub household_id: Option<Uuid>,

    #[sqlx(flatten)]
    pub preferences: Preferences,

    #[sqlx(flatten)]
    pub favorites: Favorites,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account may sign in
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Compact user view used when populating references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profile_img: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            profile_img: user.profile_img.clone(),
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,

    /// Already normalized email
    pub email: String,

    /// Full phone number
    pub phone: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub role: UserRole,
}

/// Lowercases and trims an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Joins a country code and local number into a full phone number
///
/// A missing leading `+` on the country code is added.
pub fn compose_phone(phone_code: &str, phone: &str) -> String {
    let code = phone_code.trim();
    let local = phone.trim();
    if code.starts_with('+') {
        format!("{}{}", code, local)
    } else {
        format!("+{}{}", code, local)
    }
}

/// Checks the E.164 shape: `+`, a non-zero digit, then 1-14 more digits
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on unique violations (`users_email_key`,
    /// `users_phone_key`) or connection failures.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, phone, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by normalized email address
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user matching either the email or the phone number
    pub async fn find_by_contact<'e, E>(
        executor: E,
        email: &str,
        phone: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 OR phone = $2 \
             ORDER BY created_at \
             LIMIT 1"
        ))
        .bind(email)
        .bind(phone)
        .fetch_optional(executor)
        .await
    }

    /// Points a household-less user at a household
    ///
    /// Returns false when the user does not exist or already has one.
    pub async fn assign_household<'e, E>(
        executor: E,
        id: Uuid,
        household_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET household_id = $2, updated_at = NOW()
            WHERE id = $1 AND household_id IS NULL
            "#,
        )
        .bind(id)
        .bind(household_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrites the preference block
    ///
    /// Returns the stored preferences, or None if the user doesn't exist.
    pub async fn update_preferences<'e, E>(
        executor: E,
        id: Uuid,
        preferences: &Preferences,
    ) -> Result<Option<Preferences>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Preferences>(
            r#"
            UPDATE users
            SET diet_type = $2, allergies = $3, disliked_ingredients = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING diet_type, allergies, disliked_ingredients
            "#,
        )
        .bind(id)
        .bind(preferences.diet_type)
        .bind(&preferences.allergies)
        .bind(&preferences.disliked_ingredients)
        .fetch_optional(executor)
        .await
    }

    /// Adds a recipe to the user's favorites
    ///
    /// Returns true only if the recipe was not already a favorite.
    pub async fn add_favorite<'e, E>(
        executor: E,
        id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET favorite_recipes = array_append(favorite_recipes, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(favorite_recipes))
            "#,
        )
        .bind(id)
        .bind(recipe_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a recipe from the user's favorites
    ///
    /// Returns true only if the recipe was a favorite.
    pub async fn remove_favorite<'e, E>(
        executor: E,
        id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET favorite_recipes = array_remove(favorite_recipes, $2), updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(favorite_recipes)
            "#,
        )
        .bind(id)
        .bind(recipe_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
