/// Postgres-backed store
///
/// Thin layer over the model functions. Multi-write operations open a
/// transaction and pass `&mut *tx` to each model call; dropping the
/// transaction on an early return rolls it back.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Registration, Store, StoreError, StoreResult};
use crate::db::pool::{health_check, pool_stats};
use crate::models::household::{CreateHousehold, Household};
use crate::models::invitation::{CreateInvitation, Invitation, InvitationDetails};
use crate::models::recipe::{CreateRecipe, Recipe, RecipeFilter, RecipeKey, RecipePage};
use crate::models::user::{CreateUser, Favorites, Preferences, User};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;

        let stats = pool_stats(&self.pool);
        debug!(
            active = stats.active_connections,
            idle = stats.idle_connections,
            total = stats.total_connections,
            "Pool status"
        );
        Ok(())
    }

    async fn register_user(&self, user: CreateUser, with_household: bool) -> StoreResult<Registration> {
        let mut tx = self.pool.begin().await?;

        let mut created = User::create(&mut *tx, user).await?;

        let household = if with_household {
            let household =
                Household::create(&mut *tx, CreateHousehold::for_owner(&created.name, created.id)).await?;

            if !User::assign_household(&mut *tx, created.id, household.id).await? {
                return Err(StoreError::InvalidState(
                    "New user already belongs to a household".to_string(),
                ));
            }
            created.household_id = Some(household.id);
            Some(household)
        } else {
            None
        };

        tx.commit().await?;

        info!(
            user_id = %created.id,
            household_id = ?created.household_id,
            "Registered user"
        );

        Ok(Registration {
            user: created,
            household,
        })
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_contact(&self, email: &str, phone: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_contact(&self.pool, email, phone).await?)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: Preferences,
    ) -> StoreResult<Option<Preferences>> {
        Ok(User::update_preferences(&self.pool, user_id, &preferences).await?)
    }

    async fn add_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites> {
        let mut tx = self.pool.begin().await?;

        if User::add_favorite(&mut *tx, user_id, recipe_id).await? {
            Recipe::adjust_favorites_count(&mut *tx, recipe_id, 1).await?;
        }

        let user = User::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(StoreError::NotFound("User"))?;

        tx.commit().await?;
        Ok(user.favorites)
    }

    async fn remove_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites> {
        let mut tx = self.pool.begin().await?;

        if User::remove_favorite(&mut *tx, user_id, recipe_id).await? {
            Recipe::adjust_favorites_count(&mut *tx, recipe_id, -1).await?;
        }

        let user = User::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(StoreError::NotFound("User"))?;

        tx.commit().await?;
        Ok(user.favorites)
    }

    async fn find_household(&self, id: Uuid) -> StoreResult<Option<Household>> {
        Ok(Household::find_by_id(&self.pool, id).await?)
    }

    async fn create_invitation(&self, invitation: CreateInvitation) -> StoreResult<Invitation> {
        Ok(Invitation::create(&self.pool, invitation).await?)
    }

    async fn find_pending_invitation(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> StoreResult<Option<Invitation>> {
        Ok(Invitation::find_pending(&self.pool, code, user_id).await?)
    }

    async fn list_invitations(&self, household_id: Uuid) -> StoreResult<Vec<InvitationDetails>> {
        Ok(Invitation::list_for_household(&self.pool, household_id).await?)
    }

    async fn accept_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> StoreResult<Household> {
        let mut tx = self.pool.begin().await?;

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, code, household_id, invited_by, invited_user, status, created_at, updated_at
            FROM invitations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Invitation"))?;

        if !Invitation::mark_accepted(&mut *tx, invitation.id).await? {
            return Err(StoreError::InvalidState(
                "Invalid or expired invitation code".to_string(),
            ));
        }

        let household = Household::add_member(&mut *tx, invitation.household_id, user_id)
            .await?
            .ok_or(StoreError::NotFound("Household"))?;

        if !User::assign_household(&mut *tx, user_id, household.id).await? {
            return Err(StoreError::InvalidState(
                "User already belongs to a household".to_string(),
            ));
        }

        tx.commit().await?;

        info!(
            invitation_id = %invitation.id,
            household_id = %household.id,
            user_id = %user_id,
            "Invitation accepted"
        );
        Ok(household)
    }

    async fn create_recipe(&self, recipe: CreateRecipe) -> StoreResult<Recipe> {
        Ok(Recipe::create(&self.pool, recipe).await?)
    }

    async fn find_recipe(&self, key: &RecipeKey) -> StoreResult<Option<Recipe>> {
        let recipe = match key {
            RecipeKey::Id(id) => Recipe::find_by_id(&self.pool, *id).await?,
            RecipeKey::Slug(slug) => Recipe::find_by_slug(&self.pool, slug).await?,
        };
        Ok(recipe)
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<RecipePage> {
        Ok(Recipe::list(&self.pool, filter).await?)
    }
}
