/// Authorization policy
///
/// Everything that decides "may this caller do that" lives here:
///
/// 1. **Capabilities**: each [`UserRole`] maps to a fixed capability set
/// 2. **Household membership**: owner or listed member
/// 3. **Recipe visibility**: who may read a single recipe, and which recipes
///    show up in listings
///
/// # Example
///
/// ```
/// use hearth_shared::auth::authorization::{require_capability, Capability};
/// use hearth_shared::models::user::UserRole;
///
/// assert!(require_capability(UserRole::Owner, Capability::InviteMembers).is_ok());
/// assert!(require_capability(UserRole::Member, Capability::InviteMembers).is_err());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::household::Household;
use crate::models::recipe::Recipe;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    /// Anonymous caller on a non-public resource
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Missing capability: {0:?}")]
    MissingCapability(Capability),

    #[error("Not a member of this household")]
    NotHouseholdMember,

    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Issue household invitations
    InviteMembers,

    /// List a household's invitations
    ViewInvitations,

    CreateRecipes,

    /// Accept an invitation
    JoinHousehold,
}

const OWNER_CAPABILITIES: &[Capability] = &[
    Capability::InviteMembers,
    Capability::ViewInvitations,
    Capability::CreateRecipes,
    Capability::JoinHousehold,
];

const MEMBER_CAPABILITIES: &[Capability] = &[Capability::CreateRecipes, Capability::JoinHousehold];

/// Capability set granted to a role
pub fn capabilities(role: UserRole) -> &'static [Capability] {
    match role {
        UserRole::Owner => OWNER_CAPABILITIES,
        UserRole::Member | UserRole::Admin => MEMBER_CAPABILITIES,
    }
}

pub fn has_capability(role: UserRole, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

pub fn require_capability(role: UserRole, capability: Capability) -> Result<(), AuthzError> {
    if has_capability(role, capability) {
        Ok(())
    } else {
        Err(AuthzError::MissingCapability(capability))
    }
}

/// Requires the user to be the household's owner or one of its members
pub fn require_household_member(household: &Household, user_id: Uuid) -> Result<(), AuthzError> {
    if household.includes(user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotHouseholdMember)
    }
}

/// Why a single recipe read was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeAccess {
    /// Public and published
    Public,
    Author,
    /// Caller belongs to the recipe's household
    Household,
}

/// Decides whether `caller` may read `recipe`
///
/// `household` is the recipe's household, if it has one and it exists.
pub fn recipe_access(
    recipe: &Recipe,
    caller: Option<Uuid>,
    household: Option<&Household>,
) -> Result<RecipeAccess, AuthzError> {
    if recipe.is_public_and_published() {
        return Ok(RecipeAccess::Public);
    }

    let caller = caller.ok_or(AuthzError::Unauthenticated)?;

    if recipe.created_by == caller {
        return Ok(RecipeAccess::Author);
    }

    match household {
        Some(h) if recipe.household_id == Some(h.id) && h.includes(caller) => {
            Ok(RecipeAccess::Household)
        }
        _ => Err(AuthzError::NotAuthorized),
    }
}

/// Authenticated caller as seen by recipe listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: Uuid,
    pub household_id: Option<Uuid>,
}

/// Whether a recipe may appear in a listing for this viewer
///
/// Anonymous viewers see public, published recipes; signed-in viewers also
/// see their own recipes and their household's.
pub fn listing_visible(recipe: &Recipe, viewer: Option<&Viewer>) -> bool {
    if recipe.is_public_and_published() {
        return true;
    }

    match viewer {
        Some(v) => {
            recipe.created_by == v.user_id
                || (v.household_id.is_some() && recipe.household_id == v.household_id)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::household::HouseholdStatus;
    use crate::models::recipe::{Nutrition, RecipeSource, RecipeStatus};
    use chrono::Utc;

    fn household(owner: Uuid, members: Vec<Uuid>) -> Household {
        Household {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            owner_id: owner,
            members,
            status: HouseholdStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn recipe(author: Uuid, household_id: Option<Uuid>, is_public: bool, status: RecipeStatus) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            title: "Dal".to_string(),
            description: "Comforting yellow lentils".to_string(),
            cuisine: String::new(),
            tags: vec![],
            diet_tags: vec![],
            allergens: vec![],
            ingredients: vec![],
            steps: vec![],
            servings: 2,
            prep_time: 0,
            cook_time: 0,
            total_time: 0,
            nutrition: Nutrition::default(),
            cover_image: None,
            images: vec![],
            video_url: None,
            created_by: author,
            household_id,
            source: RecipeSource::User,
            is_public,
            status,
            verified: false,
            favorites_count: 0,
            rating_average: 0.0,
            rating_count: 0,
            slug: "dal-000000".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_capabilities_by_role() {
        assert!(has_capability(UserRole::Owner, Capability::InviteMembers));
        assert!(has_capability(UserRole::Owner, Capability::ViewInvitations));
        assert!(!has_capability(UserRole::Member, Capability::InviteMembers));
        assert!(!has_capability(UserRole::Admin, Capability::ViewInvitations));
        assert!(has_capability(UserRole::Member, Capability::CreateRecipes));
        assert!(has_capability(UserRole::Admin, Capability::JoinHousehold));

        assert_eq!(
            require_capability(UserRole::Member, Capability::ViewInvitations),
            Err(AuthzError::MissingCapability(Capability::ViewInvitations))
        );
    }

    #[test]
    fn test_household_membership() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let h = household(owner, vec![owner, member]);

        assert!(require_household_member(&h, owner).is_ok());
        assert!(require_household_member(&h, member).is_ok());
        assert_eq!(
            require_household_member(&h, Uuid::new_v4()),
            Err(AuthzError::NotHouseholdMember)
        );
    }

    #[test]
    fn test_public_published_recipe_is_open() {
        let r = recipe(Uuid::new_v4(), None, true, RecipeStatus::Published);
        assert_eq!(recipe_access(&r, None, None), Ok(RecipeAccess::Public));
    }

    #[test]
    fn test_draft_recipe_access() {
        let author = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let h = household(owner, vec![owner, member]);
        let r = recipe(author, Some(h.id), true, RecipeStatus::Draft);

        assert_eq!(recipe_access(&r, None, Some(&h)), Err(AuthzError::Unauthenticated));
        assert_eq!(recipe_access(&r, Some(author), Some(&h)), Ok(RecipeAccess::Author));
        assert_eq!(recipe_access(&r, Some(owner), Some(&h)), Ok(RecipeAccess::Household));
        assert_eq!(recipe_access(&r, Some(member), Some(&h)), Ok(RecipeAccess::Household));
        assert_eq!(
            recipe_access(&r, Some(Uuid::new_v4()), Some(&h)),
            Err(AuthzError::NotAuthorized)
        );
    }

    #[test]
    fn test_private_published_recipe_is_not_open() {
        let author = Uuid::new_v4();
        let r = recipe(author, Some(Uuid::new_v4()), false, RecipeStatus::Published);

        assert_eq!(recipe_access(&r, None, None), Err(AuthzError::Unauthenticated));
        assert_eq!(recipe_access(&r, Some(Uuid::new_v4()), None), Err(AuthzError::NotAuthorized));
    }

    #[test]
    fn test_household_must_match_recipe() {
        let member = Uuid::new_v4();
        let other = household(member, vec![member]);
        let r = recipe(Uuid::new_v4(), Some(Uuid::new_v4()), false, RecipeStatus::Published);

        assert_eq!(recipe_access(&r, Some(member), Some(&other)), Err(AuthzError::NotAuthorized));
    }

    #[test]
    fn test_listing_visibility() {
        let author = Uuid::new_v4();
        let household_id = Uuid::new_v4();
        let draft = recipe(author, Some(household_id), false, RecipeStatus::Draft);

        assert!(!listing_visible(&draft, None));
        assert!(listing_visible(&draft, Some(&Viewer { user_id: author, household_id: None })));
        assert!(listing_visible(
            &draft,
            Some(&Viewer { user_id: Uuid::new_v4(), household_id: Some(household_id) })
        ));
        assert!(!listing_visible(
            &draft,
            Some(&Viewer { user_id: Uuid::new_v4(), household_id: None })
        ));
    }
}
