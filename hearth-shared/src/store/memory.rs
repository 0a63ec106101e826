/// In-process store
///
/// Holds every record behind one `tokio::sync::Mutex`, so each operation,
/// multi-record writes included, is atomic. Unique keys mirror the Postgres
/// constraints. Records are kept in insertion order; listings walk them in
/// reverse for newest-first.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Registration, Store, StoreError, StoreResult};
use crate::models::household::{CreateHousehold, Household, HouseholdStatus};
use crate::models::invitation::{
    CreateInvitation, Invitation, InvitationDetails, InvitationStatus, InviteeView, InviterView,
};
use crate::models::recipe::{CreateRecipe, Recipe, RecipeFilter, RecipeKey, RecipePage};
use crate::models::user::{CreateUser, Favorites, Preferences, User, UserStatus};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    households: Vec<Household>,
    invitations: Vec<Invitation>,
    recipes: Vec<Recipe>,
}

impl State {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn household_mut(&mut self, id: Uuid) -> Option<&mut Household> {
        self.households.iter_mut().find(|h| h.id == id)
    }

    fn recipe_mut(&mut self, id: Uuid) -> Option<&mut Recipe> {
        self.recipes.iter_mut().find(|r| r.id == id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of stored invitations
    pub async fn invitation_count(&self) -> usize {
        self.state.lock().await.invitations.len()
    }

    /// Number of stored households
    pub async fn household_count(&self) -> usize {
        self.state.lock().await.households.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn register_user(&self, data: CreateUser, with_household: bool) -> StoreResult<Registration> {
        let mut state = self.state.lock().await;

        if state.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict { field: "email" });
        }
        if state.users.iter().any(|u| u.phone == data.phone) {
            return Err(StoreError::Conflict { field: "phone" });
        }

        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            phone: data.phone,
            password_hash: data.password_hash,
            profile_img: None,
            role: data.role,
            status: UserStatus::Active,
            household_id: None,
            preferences: Preferences::default(),
            favorites: Favorites::default(),
            created_at: now,
            updated_at: now,
        };

        let household = with_household.then(|| {
            let CreateHousehold { name, owner_id } = CreateHousehold::for_owner(&user.name, user.id);
            Household {
                id: Uuid::new_v4(),
                name,
                owner_id,
                members: vec![owner_id],
                status: HouseholdStatus::Active,
                created_at: now,
                updated_at: now,
            }
        });

        if let Some(household) = &household {
            user.household_id = Some(household.id);
            state.households.push(household.clone());
        }
        state.users.push(user.clone());

        Ok(Registration { user, household })
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_contact(&self, email: &str, phone: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email == email || u.phone == phone)
            .cloned())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: Preferences,
    ) -> StoreResult<Option<Preferences>> {
        let mut state = self.state.lock().await;

        Ok(state.user_mut(user_id).map(|user| {
            user.preferences = preferences;
            user.updated_at = Utc::now();
            user.preferences.clone()
        }))
    }

    async fn add_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites> {
        let mut state = self.state.lock().await;

        let user = state.user_mut(user_id).ok_or(StoreError::NotFound("User"))?;
        let added = !user.favorites.recipes.contains(&recipe_id);
        if added {
            user.favorites.recipes.push(recipe_id);
            user.updated_at = Utc::now();
        }
        let favorites = user.favorites.clone();

        if added {
            if let Some(recipe) = state.recipe_mut(recipe_id) {
                recipe.favorites_count += 1;
            }
        }

        Ok(favorites)
    }

    async fn remove_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Favorites> {
        let mut state = self.state.lock().await;

        let user = state.user_mut(user_id).ok_or(StoreError::NotFound("User"))?;
        let before = user.favorites.recipes.len();
        user.favorites.recipes.retain(|id| *id != recipe_id);
        let removed = user.favorites.recipes.len() < before;
        if removed {
            user.updated_at = Utc::now();
        }
        let favorites = user.favorites.clone();

        if removed {
            if let Some(recipe) = state.recipe_mut(recipe_id) {
                recipe.favorites_count = (recipe.favorites_count - 1).max(0);
            }
        }

        Ok(favorites)
    }

    async fn find_household(&self, id: Uuid) -> StoreResult<Option<Household>> {
        let state = self.state.lock().await;
        Ok(state.households.iter().find(|h| h.id == id).cloned())
    }

    async fn create_invitation(&self, data: CreateInvitation) -> StoreResult<Invitation> {
        let mut state = self.state.lock().await;

        if state.invitations.iter().any(|i| i.code == data.code) {
            return Err(StoreError::Conflict { field: "code" });
        }

        let now = Utc::now();
        let invitation = Invitation {
            id: Uuid::new_v4(),
            code: data.code,
            household_id: data.household_id,
            invited_by: data.invited_by,
            invited_user: Some(data.invited_user),
            status: InvitationStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.invitations.push(invitation.clone());

        Ok(invitation)
    }

    async fn find_pending_invitation(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> StoreResult<Option<Invitation>> {
        let state = self.state.lock().await;
        Ok(state
            .invitations
            .iter()
            .find(|i| {
                i.code == code
                    && i.invited_user == Some(user_id)
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    async fn list_invitations(&self, household_id: Uuid) -> StoreResult<Vec<InvitationDetails>> {
        let state = self.state.lock().await;

        let details = state
            .invitations
            .iter()
            .rev()
            .filter(|i| i.household_id == household_id)
            .map(|i| {
                let invitee = i.invited_user.and_then(|id| state.user(id)).map(|u| InviteeView {
                    id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    phone: u.phone.clone(),
                });
                let inviter = state.user(i.invited_by).map(|u| InviterView {
                    id: u.id,
                    name: u.name.clone(),
                });
                InvitationDetails::new(i.clone(), invitee, inviter)
            })
            .collect();

        Ok(details)
    }

    async fn accept_invitation(&self, invitation_id: Uuid, user_id: Uuid) -> StoreResult<Household> {
        let mut state = self.state.lock().await;

        // Check every precondition before the first write.
        let invitation = state
            .invitations
            .iter()
            .find(|i| i.id == invitation_id)
            .ok_or(StoreError::NotFound("Invitation"))?;
        if invitation.status != InvitationStatus::Pending {
            return Err(StoreError::InvalidState(
                "Invalid or expired invitation code".to_string(),
            ));
        }
        let household_id = invitation.household_id;

        if !state.households.iter().any(|h| h.id == household_id) {
            return Err(StoreError::NotFound("Household"));
        }
        match state.user(user_id) {
            None => return Err(StoreError::NotFound("User")),
            Some(user) if user.household_id.is_some() => {
                return Err(StoreError::InvalidState(
                    "User already belongs to a household".to_string(),
                ));
            }
            Some(_) => {}
        }

        let now = Utc::now();
        if let Some(invitation) = state.invitations.iter_mut().find(|i| i.id == invitation_id) {
            invitation.status = InvitationStatus::Accepted;
            invitation.updated_at = now;
        }
        if let Some(user) = state.user_mut(user_id) {
            user.household_id = Some(household_id);
            user.updated_at = now;
        }
        let household = state
            .household_mut(household_id)
            .ok_or(StoreError::NotFound("Household"))?;
        if !household.members.contains(&user_id) {
            household.members.push(user_id);
        }
        household.updated_at = now;

        Ok(household.clone())
    }

    async fn create_recipe(&self, data: CreateRecipe) -> StoreResult<Recipe> {
        let mut state = self.state.lock().await;

        if state.recipes.iter().any(|r| r.slug == data.slug) {
            return Err(StoreError::Conflict { field: "slug" });
        }

        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            cuisine: data.cuisine,
            tags: data.tags,
            diet_tags: data.diet_tags,
            allergens: data.allergens,
            ingredients: data.ingredients,
            steps: data.steps,
            servings: data.servings,
            prep_time: data.prep_time,
            cook_time: data.cook_time,
            total_time: data.prep_time.saturating_add(data.cook_time),
            nutrition: data.nutrition,
            cover_image: data.cover_image,
            images: data.images,
            video_url: data.video_url,
            created_by: data.created_by,
            household_id: data.household_id,
            source: data.source,
            is_public: data.is_public,
            status: data.status,
            verified: false,
            favorites_count: 0,
            rating_average: 0.0,
            rating_count: 0,
            slug: data.slug,
            created_at: now,
            updated_at: now,
        };
        state.recipes.push(recipe.clone());

        Ok(recipe)
    }

    async fn find_recipe(&self, key: &RecipeKey) -> StoreResult<Option<Recipe>> {
        let state = self.state.lock().await;
        let found = state.recipes.iter().find(|r| match key {
            RecipeKey::Id(id) => r.id == *id,
            RecipeKey::Slug(slug) => r.slug == *slug,
        });
        Ok(found.cloned())
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> StoreResult<RecipePage> {
        let state = self.state.lock().await;

        let matching: Vec<&Recipe> = state.recipes.iter().rev().filter(|r| filter.admits(r)).collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(RecipePage { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipe::{Ingredient, Nutrition, RecipeSource, RecipeStatus, Step};
    use crate::models::user::UserRole;

    fn new_user(email: &str, phone: &str, role: UserRole) -> CreateUser {
        CreateUser {
            name: "Cook".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password_hash: "$argon2id$test".to_string(),
            role,
        }
    }

    fn new_recipe(title: &str, author: Uuid, is_public: bool) -> CreateRecipe {
        CreateRecipe {
            title: title.to_string(),
            description: "Something tasty for dinner".to_string(),
            cuisine: String::new(),
            tags: vec![],
            diet_tags: vec![],
            allergens: vec![],
            ingredients: vec![Ingredient {
                name: "Rice".to_string(),
                quantity: 1.0,
                unit: "cup".to_string(),
                note: None,
                is_optional: false,
                alternatives: vec![],
            }],
            steps: vec![Step {
                order: 1,
                text: "Cook it".to_string(),
                media_urls: vec![],
                timer_sec: None,
            }],
            servings: 2,
            prep_time: 5,
            cook_time: 10,
            nutrition: Nutrition::default(),
            cover_image: None,
            images: vec![],
            video_url: None,
            created_by: author,
            household_id: None,
            source: RecipeSource::User,
            is_public,
            status: RecipeStatus::Published,
            slug: format!("{}-{}", title.to_lowercase(), Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_register_owner_creates_household() {
        let store = MemoryStore::new();
        let reg = store
            .register_user(new_user("a@example.com", "+15550001", UserRole::Owner), true)
            .await
            .unwrap();

        let household = reg.household.unwrap();
        assert_eq!(household.owner_id, reg.user.id);
        assert_eq!(household.members, vec![reg.user.id]);
        assert_eq!(reg.user.household_id, Some(household.id));
        assert_eq!(household.name, "Cook's Household");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let store = MemoryStore::new();
        store
            .register_user(new_user("a@example.com", "+15550001", UserRole::Member), false)
            .await
            .unwrap();

        let err = store
            .register_user(new_user("a@example.com", "+15550002", UserRole::Member), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "email" }));

        let err = store
            .register_user(new_user("b@example.com", "+15550001", UserRole::Owner), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "phone" }));

        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.household_count().await, 0);
    }

    #[tokio::test]
    async fn test_accept_invitation_once() {
        let store = MemoryStore::new();
        let owner = store
            .register_user(new_user("o@example.com", "+15550001", UserRole::Owner), true)
            .await
            .unwrap();
        let guest = store
            .register_user(new_user("g@example.com", "+15550002", UserRole::Member), false)
            .await
            .unwrap()
            .user;
        let household_id = owner.user.household_id.unwrap();

        let invitation = store
            .create_invitation(CreateInvitation {
                code: "abcdef012345".to_string(),
                household_id,
                invited_by: owner.user.id,
                invited_user: guest.id,
            })
            .await
            .unwrap();

        let household = store.accept_invitation(invitation.id, guest.id).await.unwrap();
        assert_eq!(household.members, vec![owner.user.id, guest.id]);

        let err = store.accept_invitation(invitation.id, guest.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidState(_)));

        let household = store.find_household(household_id).await.unwrap().unwrap();
        assert_eq!(household.members.len(), 2);
        assert!(store
            .find_pending_invitation("abcdef012345", guest.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_invitation_code() {
        let store = MemoryStore::new();
        let data = CreateInvitation {
            code: "000000000000".to_string(),
            household_id: Uuid::new_v4(),
            invited_by: Uuid::new_v4(),
            invited_user: Uuid::new_v4(),
        };

        store.create_invitation(data.clone()).await.unwrap();
        let err = store.create_invitation(data).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "code" }));
        assert_eq!(store.invitation_count().await, 1);
    }

    #[tokio::test]
    async fn test_favorites_adjust_counter_once() {
        let store = MemoryStore::new();
        let user = store
            .register_user(new_user("f@example.com", "+15550003", UserRole::Member), false)
            .await
            .unwrap()
            .user;
        let recipe = store.create_recipe(new_recipe("Pilaf", user.id, true)).await.unwrap();

        store.add_favorite(user.id, recipe.id).await.unwrap();
        let favorites = store.add_favorite(user.id, recipe.id).await.unwrap();
        assert_eq!(favorites.recipes, vec![recipe.id]);

        let stored = store.find_recipe(&RecipeKey::Id(recipe.id)).await.unwrap().unwrap();
        assert_eq!(stored.favorites_count, 1);

        store.remove_favorite(user.id, recipe.id).await.unwrap();
        let favorites = store.remove_favorite(user.id, recipe.id).await.unwrap();
        assert!(favorites.recipes.is_empty());

        let stored = store.find_recipe(&RecipeKey::Id(recipe.id)).await.unwrap().unwrap();
        assert_eq!(stored.favorites_count, 0);
    }

    #[tokio::test]
    async fn test_list_recipes_newest_first_with_paging() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        for i in 0..5 {
            store
                .create_recipe(new_recipe(&format!("Dish{}", i), author, true))
                .await
                .unwrap();
        }

        let page = store
            .list_recipes(&RecipeFilter {
                page: 2,
                limit: 2,
                ..RecipeFilter::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        let titles: Vec<&str> = page.items.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Dish2", "Dish1"]);
    }

    #[tokio::test]
    async fn test_find_recipe_by_slug() {
        let store = MemoryStore::new();
        let recipe = store
            .create_recipe(new_recipe("Khichdi", Uuid::new_v4(), true))
            .await
            .unwrap();

        let found = store
            .find_recipe(&RecipeKey::Slug(recipe.slug.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, recipe.id);
        assert!(store
            .find_recipe(&RecipeKey::Slug("missing".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_total_time_saturates() {
        let store = MemoryStore::new();
        let mut data = new_recipe("Stock", Uuid::new_v4(), true);
        data.prep_time = i32::MAX;
        data.cook_time = i32::MAX;

        let recipe = store.create_recipe(data).await.unwrap();
        assert_eq!(recipe.total_time, i32::MAX);
    }
}
