/// Persistence port
///
/// Route handlers talk to a [`Store`] rather than to Postgres directly. Two
/// implementations exist:
///
/// - [`PgStore`]: the production store, one SQL transaction per multi-write
///   operation
/// - [`MemoryStore`]: an in-process store holding everything under a single
///   lock, used by the HTTP tests
///
/// Both enforce the same unique keys (user email, user phone, invitation
/// code, recipe slug) and report violations as [`StoreError::Conflict`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::household::Household;
use crate::models::invitation::{CreateInvitation, Invitation, InvitationDetails};
use crate::models::recipe::{CreateRecipe, Recipe, RecipeFilter, RecipeKey, RecipePage};
use crate::models::user::{CreateUser, Favorites, Preferences, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record the operation depends on is missing
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique key is already taken
    #[error("{field} already exists")]
    Conflict { field: &'static str },

    /// The operation lost a race or its preconditions no longer hold
    #[error("{0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Field name for a unique constraint
pub fn conflict_field(constraint: &str) -> &'static str {
    match constraint {
        "users_email_key" => "email",
        "users_phone_key" => "phone",
        "invitations_code_key" => "code",
        "recipes_slug_key" => "slug",
        _ => "resource",
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let field = conflict_field(db_err.constraint().unwrap_or_default());
                return StoreError::Conflict { field };
            }
        }
        StoreError::Database(err)
    }
}

/// Outcome of a registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// The new user, household reference already filled in
    pub user: User,

    /// Present when the user registered as a household owner
    pub household: Option<Household>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()>;

    /// Creates a user and, for owners, their household as one unit
    async fn register_user(&self, user: CreateUser, with_household: bool) -> StoreResult<Registration>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// First user whose email or phone matches
    async fn find_user_by_contact(&self, email: &str, phone: &str) -> StoreResult<Option<User>>;

    /// Replaces the preference block; None if the user doesn't exist
    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: Preferences,
    ) -> StoreResult<Option<Preferences>>;

    /// Adds a favorite; the recipe counter moves only on an actual change
    async fn add_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites>;

    /// Removes a favorite; the recipe counter moves only on an actual change
    async fn remove_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites>;

    async fn find_household(&self, id: Uuid) -> StoreResult<Option<Household>>;

    async fn create_invitation(&self, invitation: CreateInvitation) -> StoreResult<Invitation>;

    /// Pending invitation with this code addressed to this user
    async fn find_pending_invitation(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> StoreResult<Option<Invitation>>;

    /// Household invitations, newest first
    async fn list_invitations(&self, household_id: Uuid) -> StoreResult<Vec<InvitationDetails>>;

    /// Accepts an invitation: marks it accepted, adds the user to the
    /// household and points the user at it, all or nothing
    ///
    /// Fails with `InvalidState` if the invitation is no longer pending or the
    /// user already has a household.
    async fn accept_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> StoreResult<Household>;

    async fn create_recipe(&self, recipe: CreateRecipe) -> StoreResult<Recipe>;

    async fn find_recipe(&self, key: &RecipeKey) -> StoreResult<Option<Recipe>>;

    async fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<RecipePage>;
}
