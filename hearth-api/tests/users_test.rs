//! Preferences, profile and favorites over HTTP

mod common;

use axum::http::StatusCode;
use common::TestContext;
use hearth_shared::models::recipe::RecipeKey;
use hearth_shared::models::user::{DietType, UserRole};
use hearth_shared::store::Store;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_update_preferences() {
    let ctx = TestContext::new();
    let user = ctx.register("Pat", UserRole::Member).await;

    let (status, body) = ctx
        .post(
            "/api/users/preferences",
            Some(&user.token),
            json!({ "dietType": "vegan", "allergies": ["peanut", "sesame"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preferences"]["dietType"], "vegan");
    assert_eq!(body["preferences"]["allergies"], json!(["peanut", "sesame"]));
    assert_eq!(body["preferences"]["dislikedIngredients"], json!([]));

    let stored = ctx.store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.preferences.diet_type, DietType::Vegan);

    // Overwrites rather than merges
    ctx.post(
        "/api/users/preferences",
        Some(&user.token),
        json!({ "dietType": "keto", "dislikedIngredients": ["olives"] }),
    )
    .await;
    let (_, me) = ctx.get("/api/users/me", Some(&user.token)).await;
    assert_eq!(me["preferences"]["dietType"], "keto");
    assert_eq!(me["preferences"]["allergies"], json!([]));
    assert_eq!(me["preferences"]["dislikedIngredients"], json!(["olives"]));
}

#[tokio::test]
async fn test_update_preferences_rejects_bad_input() {
    let ctx = TestContext::new();
    let user = ctx.register("Pat", UserRole::Member).await;

    let (status, _) = ctx
        .post("/api/users/preferences", Some(&user.token), json!({ "allergies": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/api/users/preferences",
            Some(&user.token),
            json!({ "dietType": "carnivore" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post("/api/users/preferences", None, json!({ "dietType": "vegan" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = ctx.token_for(Uuid::new_v4(), UserRole::Member);
    let (status, _) = ctx
        .post("/api/users/preferences", Some(&ghost), json!({ "dietType": "vegan" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_profile_shape() {
    let ctx = TestContext::new();
    let owner = ctx.register("Olive", UserRole::Owner).await;

    let (status, me) = ctx.get("/api/users/me", Some(&owner.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Olive");
    assert_eq!(me["role"], "owner");
    assert_eq!(me["status"], "active");
    assert_eq!(me["household"], owner.household_id.unwrap().to_string());
    assert_eq!(me["preferences"]["dietType"], "none");
    assert_eq!(me["favorites"]["recipes"], json!([]));
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_favorites_are_idempotent() {
    let ctx = TestContext::new();
    let cook = ctx.register("Cora", UserRole::Member).await;
    let fan = ctx.register("Fay", UserRole::Member).await;

    let (_, body) = ctx.create_recipe(&cook.token, json!({})).await;
    let recipe_id: Uuid = serde_json::from_value(body["recipe"]["id"].clone()).unwrap();
    let uri = format!("/api/users/favorites/{}", recipe_id);

    for _ in 0..2 {
        let (status, body) = ctx.put(&uri, Some(&fan.token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["favorites"]["recipes"], json!([recipe_id.to_string()]));
    }

    let recipe = ctx
        .store
        .find_recipe(&RecipeKey::Id(recipe_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recipe.favorites_count, 1);

    for _ in 0..2 {
        let (status, body) = ctx.delete(&uri, Some(&fan.token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["favorites"]["recipes"], json!([]));
    }

    let recipe = ctx
        .store
        .find_recipe(&RecipeKey::Id(recipe_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recipe.favorites_count, 0);
}

#[tokio::test]
async fn test_favorite_requires_visible_recipe() {
    let ctx = TestContext::new();
    let owner = ctx.register("Olive", UserRole::Owner).await;
    let stranger = ctx.register("Sid", UserRole::Member).await;

    let (_, body) = ctx
        .create_recipe(
            &owner.token,
            json!({ "household": owner.household_id.unwrap().to_string(), "isPublic": false }),
        )
        .await;
    let private_uri = format!("/api/users/favorites/{}", body["recipe"]["id"].as_str().unwrap());

    let (status, _) = ctx.put(&private_uri, Some(&stranger.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.put(&private_uri, Some(&owner.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .put(&format!("/api/users/favorites/{}", Uuid::new_v4()), Some(&stranger.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.put("/api/users/favorites/not-a-uuid", Some(&stranger.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.put(&private_uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
