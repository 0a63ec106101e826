/// Account endpoints for the signed-in user
///
/// - `POST /api/users/preferences` - Replace dietary preferences
/// - `GET /api/users/me` - Own profile
/// - `PUT /api/users/favorites/:recipe_id` - Bookmark a recipe
/// - `DELETE /api/users/favorites/:recipe_id` - Remove a bookmark

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{required, Payload},
    routes::recipes::authorize_read,
};
use axum::{
    extract::{Path, State},
    Json,
};
use hearth_shared::{
    auth::middleware::AuthContext,
    models::{
        recipe::RecipeKey,
        user::{DietType, Favorites, Preferences, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub diet_type: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub disliked_ingredients: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub message: String,
    pub preferences: Preferences,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Favorites,
}

/// Replace the caller's dietary preferences
///
/// # Endpoint
///
/// ```text
/// POST /api/users/preferences
/// Authorization: Bearer <token>
///
/// { "dietType": "vegan", "allergies": ["peanut"], "dislikedIngredients": [] }
/// ```
///
/// Omitted lists are stored as empty.
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthContext,
    Payload(req): Payload<PreferencesRequest>,
) -> ApiResult<Json<PreferencesResponse>> {
    let raw = required(&req.diet_type, "Diet type is required")?;
    let diet_type = DietType::parse(&raw.to_lowercase())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid diet type: {}", raw)))?;

    let preferences = Preferences {
        diet_type,
        allergies: req.allergies.unwrap_or_default(),
        disliked_ingredients: req.disliked_ingredients.unwrap_or_default(),
    };

    let preferences = state
        .store
        .update_preferences(auth.user_id, preferences)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %auth.user_id, "Preferences updated");

    Ok(Json(PreferencesResponse {
        message: "Preferences updated".to_string(),
        preferences,
    }))
}

/// The caller's profile; the password hash is never serialized
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

fn parse_recipe_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::invalid_field("recipeId", "Recipe id must be a valid ID"))
}

/// Bookmark a recipe the caller can read
///
/// Idempotent; the recipe's favorites counter only moves on the first add.
///
/// # Errors
///
/// - `401 Unauthorized`: No valid token
/// - `403 Forbidden`: Recipe not visible to the caller
/// - `404 Not Found`: Recipe or caller missing
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<FavoritesResponse>> {
    let recipe_id = parse_recipe_id(&recipe_id)?;

    let recipe = state
        .store
        .find_recipe(&RecipeKey::Id(recipe_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))?;
    authorize_read(&state, &recipe, Some(auth.user_id)).await?;

    let favorites = state.store.add_favorite(auth.user_id, recipe.id).await?;

    Ok(Json(FavoritesResponse { favorites }))
}

/// Remove a bookmark; removing one that isn't there is not an error
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<FavoritesResponse>> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let favorites = state.store.remove_favorite(auth.user_id, recipe_id).await?;

    Ok(Json(FavoritesResponse { favorites }))
}
