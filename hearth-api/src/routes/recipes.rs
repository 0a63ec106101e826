/// Recipe endpoints
///
/// - `GET /api/recipes` - Search and page through visible recipes
/// - `POST /api/recipes` - Create a recipe (signed-in callers)
/// - `GET /api/recipes/:id` - Fetch one recipe by ID or slug
///
/// Public, published recipes are readable by anyone. Everything else is
/// readable by its author and by members of its household.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Payload,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hearth_shared::{
    auth::{
        authorization::{
            recipe_access, require_capability, require_household_member, Capability, Viewer,
        },
        middleware::AuthContext,
    },
    models::{
        household::Household,
        recipe::{
            generate_slug, CreateRecipe, Ingredient, Nutrition, Recipe, RecipeFilter, RecipeKey,
            RecipeSource, RecipeStatus, Step, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
        },
        user::{DietType, UserSummary},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidateUrl, ValidationError};

fn default_servings() -> i32 {
    2
}

/// Recipe creation payload
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = "validate_description"))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 120, message = "Cuisine must be at most 120 characters"))]
    pub cuisine: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Defaults to `["none"]` when empty
    #[serde(default)]
    pub diet_tags: Vec<DietType>,

    #[serde(default)]
    pub allergens: Vec<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one ingredient is required"), nested)]
    pub ingredients: Vec<IngredientInput>,

    #[serde(default)]
    #[validate(length(min = 1, message = "At least one step is required"), nested)]
    pub steps: Vec<StepInput>,

    #[serde(default = "default_servings")]
    #[validate(range(min = 1, message = "Servings must be at least 1"))]
    pub servings: i32,

    #[serde(default)]
    /// Minutes; at most one week
    #[validate(range(min = 0, max = 10080, message = "Prep time must be between 0 and 10080 minutes"))]
    pub prep_time: i32,

    #[serde(default)]
    /// Minutes; at most one week
    #[validate(range(min = 0, max = 10080, message = "Cook time must be between 0 and 10080 minutes"))]
    pub cook_time: i32,

    #[serde(default)]
    #[validate(nested)]
    pub nutrition: NutritionInput,

    #[validate(url(message = "Cover image must be a valid URL"))]
    pub cover_image: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_urls"))]
    pub images: Vec<String>,

    #[validate(url(message = "Video URL must be a valid URL"))]
    pub video_url: Option<String>,

    #[serde(default)]
    pub source: RecipeSource,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub status: RecipeStatus,

    /// Household ID; must parse as a UUID
    pub household: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Quantity cannot be negative"))]
    pub quantity: f64,

    #[serde(default)]
    pub unit: String,

    pub note: Option<String>,

    #[serde(default)]
    pub is_optional: bool,

    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    #[validate(range(min = 1, message = "Step order must be at least 1"))]
    pub order: i64,

    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,

    #[serde(default)]
    #[validate(custom(function = "validate_urls"))]
    pub media_urls: Vec<String>,

    /// Seconds; at most one week
    #[validate(range(min = 0, max = 604800, message = "Timer must be between 0 and 604800 seconds"))]
    pub timer_sec: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct NutritionInput {
    #[validate(range(min = 0.0, message = "Calories cannot be negative"))]
    pub calories: Option<f64>,

    #[validate(range(min = 0.0, message = "Protein cannot be negative"))]
    pub protein: Option<f64>,

    #[validate(range(min = 0.0, message = "Carbs cannot be negative"))]
    pub carbs: Option<f64>,

    #[validate(range(min = 0.0, message = "Fats cannot be negative"))]
    pub fats: Option<f64>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (3..=120).contains(&len) {
        Ok(())
    } else {
        Err(invalid("length", "Title must be 3-120 characters"))
    }
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    let len = description.trim().chars().count();
    if (10..=2000).contains(&len) {
        Ok(())
    } else {
        Err(invalid("length", "Description must be 10-2000 characters"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("required", "Must not be blank"))
    } else {
        Ok(())
    }
}

fn validate_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.iter().all(|url| url.validate_url()) {
        Ok(())
    } else {
        Err(invalid("url", "Must be valid URLs"))
    }
}

/// Step orders must run 1, 2, 3, ...
fn check_step_order(steps: &[StepInput]) -> ApiResult<()> {
    let sequential = steps
        .iter()
        .enumerate()
        .all(|(index, step)| step.order == index as i64 + 1);

    if sequential {
        Ok(())
    } else {
        Err(ApiError::invalid_field(
            "steps",
            "Step order must be sequential starting at 1",
        ))
    }
}

impl CreateRecipeRequest {
    fn into_new_recipe(self, created_by: Uuid, household_id: Option<Uuid>) -> CreateRecipe {
        let diet_tags = if self.diet_tags.is_empty() {
            vec![DietType::None]
        } else {
            self.diet_tags
        };

        let ingredients = self
            .ingredients
            .into_iter()
            .map(|i| Ingredient {
                name: i.name.trim().to_string(),
                quantity: i.quantity,
                unit: i.unit.trim().to_string(),
                note: i.note,
                is_optional: i.is_optional,
                alternatives: i.alternatives,
            })
            .collect();

        let steps = self
            .steps
            .into_iter()
            .map(|s| Step {
                order: u32::try_from(s.order).unwrap_or(u32::MAX),
                text: s.text.trim().to_string(),
                media_urls: s.media_urls,
                timer_sec: s.timer_sec.and_then(|t| u32::try_from(t).ok()),
            })
            .collect();

        let title = self.title.trim().to_string();
        let slug = generate_slug(&title);

        CreateRecipe {
            title,
            description: self.description.trim().to_string(),
            cuisine: self.cuisine.trim().to_string(),
            tags: self.tags,
            diet_tags,
            allergens: self.allergens,
            ingredients,
            steps,
            servings: self.servings,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            nutrition: Nutrition {
                calories: self.nutrition.calories,
                protein: self.nutrition.protein,
                carbs: self.nutrition.carbs,
                fats: self.nutrition.fats,
            },
            cover_image: self.cover_image,
            images: self.images,
            video_url: self.video_url,
            created_by,
            household_id,
            source: self.source,
            is_public: self.is_public,
            status: self.status,
            slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRecipeResponse {
    pub recipe: Recipe,
}

/// Household as embedded in a recipe read
#[derive(Debug, Serialize)]
pub struct HouseholdSummary {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub members: Vec<Uuid>,
}

impl From<&Household> for HouseholdSummary {
    fn from(household: &Household) -> Self {
        Self {
            id: household.id,
            name: household.name.clone(),
            owner: household.owner_id,
            members: household.members.clone(),
        }
    }
}

/// Listing query string; every value arrives as text and is parsed here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecipesQuery {
    pub q: Option<String>,
    pub household_id: Option<String>,
    pub is_public: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct RecipeListResponse {
    pub data: Vec<Recipe>,
    pub pagination: Pagination,
}

/// Positive integer, or `default` when absent or unusable
fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl ListRecipesQuery {
    fn into_filter(self, viewer: Option<Viewer>) -> ApiResult<RecipeFilter> {
        let is_public = match self.is_public.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(_) => {
                return Err(ApiError::invalid_field(
                    "isPublic",
                    "isPublic must be \"true\" or \"false\"",
                ))
            }
        };

        let household_id = match self.household_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
                ApiError::invalid_field("householdId", "householdId must be a valid ID")
            })?),
        };

        let query = self
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        Ok(RecipeFilter {
            query,
            household_id,
            is_public,
            viewer,
            page: positive_or(self.page.as_deref(), 1),
            limit: positive_or(self.limit.as_deref(), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        })
    }
}

/// Checks read access to a recipe, returning its household when it has one
pub(crate) async fn authorize_read(
    state: &AppState,
    recipe: &Recipe,
    caller: Option<Uuid>,
) -> ApiResult<Option<Household>> {
    let household = match recipe.household_id {
        Some(id) => state.store.find_household(id).await?,
        None => None,
    };

    let access = recipe_access(recipe, caller, household.as_ref())?;
    tracing::debug!(recipe_id = %recipe.id, ?access, "Recipe read allowed");

    Ok(household)
}

/// Fetch one recipe by ID or slug
///
/// # Endpoint
///
/// ```text
/// GET /api/recipes/:id
/// ```
///
/// # Response
///
/// ```json
/// {
///   "data": {
///     "id": "uuid",
///     "title": "Tomato Soup",
///     "createdBy": { "id": "uuid", "name": "Jane", "profileImg": null, "phone": "+1...", "email": "..." },
///     "household": { "id": "uuid", "name": "Jane's Household", "owner": "uuid", "members": ["uuid"] },
///     ...
///   }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Blank ID
/// - `401 Unauthorized`: Private recipe, anonymous caller
/// - `403 Forbidden`: Private recipe, caller is neither author nor household member
/// - `404 Not Found`: No such recipe
pub async fn get_recipe(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest("Recipe id is required".to_string()));
    }

    let recipe = state
        .store
        .find_recipe(&RecipeKey::parse(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))?;

    let household = authorize_read(&state, &recipe, auth.map(|a| a.user_id)).await?;
    let author = state.store.find_user(recipe.created_by).await?;

    let mut data = serde_json::to_value(&recipe)
        .map_err(|e| ApiError::InternalError(format!("Failed to serialize recipe: {}", e)))?;
    if let Some(fields) = data.as_object_mut() {
        let created_by = serde_json::to_value(author.as_ref().map(UserSummary::from))
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let household = serde_json::to_value(household.as_ref().map(HouseholdSummary::from))
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        fields.insert("createdBy".to_string(), created_by);
        fields.insert("household".to_string(), household);
    }

    let mut body = serde_json::Map::new();
    body.insert("data".to_string(), data);
    Ok(Json(Value::Object(body)))
}

/// Create a recipe
///
/// # Endpoint
///
/// ```text
/// POST /api/recipes
/// Authorization: Bearer <token>
///
/// {
///   "title": "Tomato Soup",
///   "description": "A quick weeknight soup.",
///   "ingredients": [{ "name": "tomato", "quantity": 4, "unit": "pcs" }],
///   "steps": [{ "order": 1, "text": "Simmer everything." }],
///   "isPublic": true
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Schema violations (with per-field details), or
///   neither public nor tied to a household
/// - `401 Unauthorized`: No valid token
/// - `403 Forbidden`: Caller is not in the referenced household
/// - `404 Not Found`: Referenced household missing
/// - `409 Conflict`: Slug collision
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Payload(req): Payload<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<CreateRecipeResponse>)> {
    req.validate()?;
    check_step_order(&req.steps)?;
    require_capability(auth.role, Capability::CreateRecipes)?;

    let household_id = match req.household.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            ApiError::invalid_field("household", "Household must be a valid ID")
        })?),
    };

    if !req.is_public && household_id.is_none() {
        return Err(ApiError::BadRequest(
            "A recipe must be public or belong to a household".to_string(),
        ));
    }

    if let Some(id) = household_id {
        let household = state
            .store
            .find_household(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Household not found".to_string()))?;
        require_household_member(&household, auth.user_id)?;
    }

    let recipe = state
        .store
        .create_recipe(req.into_new_recipe(auth.user_id, household_id))
        .await?;

    tracing::info!(
        recipe_id = %recipe.id,
        slug = %recipe.slug,
        created_by = %auth.user_id,
        "Recipe created"
    );

    Ok((StatusCode::CREATED, Json(CreateRecipeResponse { recipe })))
}

/// Search and page through recipes visible to the caller
///
/// # Endpoint
///
/// ```text
/// GET /api/recipes?q=tomato&isPublic=true&page=2&limit=10
/// ```
///
/// # Response
///
/// ```json
/// {
///   "data": [ ... ],
///   "pagination": { "total": 25, "page": 2, "limit": 10, "totalPages": 3 }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Bad `isPublic` or `householdId`
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Query(params): Query<ListRecipesQuery>,
) -> ApiResult<Json<RecipeListResponse>> {
    let viewer = match auth {
        Some(auth) => {
            let household_id = state
                .store
                .find_user(auth.user_id)
                .await?
                .and_then(|user| user.household_id);
            Some(Viewer {
                user_id: auth.user_id,
                household_id,
            })
        }
        None => None,
    };

    let filter = params.into_filter(viewer)?;
    let page = state.store.list_recipes(&filter).await?;

    Ok(Json(RecipeListResponse {
        data: page.items,
        pagination: Pagination {
            total: page.total,
            page: filter.page,
            limit: filter.limit,
            total_pages: page.total.div_ceil(u64::from(filter.limit)),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(order: i64) -> StepInput {
        StepInput {
            order,
            text: "stir".to_string(),
            media_urls: Vec::new(),
            timer_sec: None,
        }
    }

    #[test]
    fn test_step_order() {
        assert!(check_step_order(&[step(1), step(2), step(3)]).is_ok());
        assert!(check_step_order(&[step(1), step(3)]).is_err());
        assert!(check_step_order(&[step(2)]).is_err());
    }

    #[test]
    fn test_positive_or() {
        assert_eq!(positive_or(Some("3"), 1), 3);
        assert_eq!(positive_or(Some("0"), 1), 1);
        assert_eq!(positive_or(Some("-4"), 20), 20);
        assert_eq!(positive_or(Some("abc"), 20), 20);
        assert_eq!(positive_or(None, 20), 20);
    }

    #[test]
    fn test_query_filter() {
        let filter = ListRecipesQuery {
            q: Some("  soup ".to_string()),
            limit: Some("500".to_string()),
            ..Default::default()
        }
        .into_filter(None)
        .unwrap();

        assert_eq!(filter.query.as_deref(), Some("soup"));
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.page, 1);

        let bad = ListRecipesQuery {
            is_public: Some("yes".to_string()),
            ..Default::default()
        }
        .into_filter(None);
        assert!(bad.is_err());
    }

    #[test]
    fn test_request_defaults_and_validation() {
        let req: CreateRecipeRequest = serde_json::from_str(
            r#"{
                "title": "  Tomato Soup ",
                "description": "A quick weeknight soup.",
                "ingredients": [{"name": "tomato", "quantity": 4}],
                "steps": [{"order": 1, "text": "Simmer"}],
                "isPublic": true
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.servings, 2);

        let recipe = req.into_new_recipe(Uuid::new_v4(), None);
        assert_eq!(recipe.title, "Tomato Soup");
        assert_eq!(recipe.diet_tags, vec![DietType::None]);
        assert_eq!(recipe.status, RecipeStatus::Published);
        assert!(recipe.slug.starts_with("tomato-soup-"));
    }

    #[test]
    fn test_request_rejects_bad_fields() {
        let req: CreateRecipeRequest = serde_json::from_str(
            r#"{
                "title": "ab",
                "description": "too short",
                "ingredients": [],
                "steps": [{"order": 1, "text": "  ", "mediaUrls": ["not a url"]}],
                "coverImage": "nope"
            }"#,
        )
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("ingredients"));
        assert!(fields.contains_key("cover_image"));
        assert!(errors.errors().contains_key("steps"));
    }
}
