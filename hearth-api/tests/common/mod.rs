//! Shared infrastructure for the HTTP integration tests
//!
//! Every test gets its own router over a fresh [`MemoryStore`], so tests
//! need no database and can run in parallel.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use hearth_api::app::{build_router, AppState};
use hearth_api::config::Config;
use hearth_shared::auth::jwt::{create_token, Claims};
use hearth_shared::models::user::UserRole;
use hearth_shared::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// A registered account and a token for it
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Full phone number as stored
    pub phone: String,
    pub token: String,
    pub household_id: Option<Uuid>,
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
    next_phone: AtomicU32,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgresql://unused/hearth".to_string()),
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })
        .expect("test config");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        Self {
            store,
            app,
            config,
            next_phone: AtomicU32::new(1),
        }
    }

    /// Sends a request through the router and decodes the JSON body
    ///
    /// Empty or non-JSON bodies decode as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a prebuilt request
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, None).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Unique local phone number (country code 1)
    pub fn phone(&self) -> String {
        let n = self.next_phone.fetch_add(1, Ordering::SeqCst);
        format!("555{:07}", n)
    }

    /// Registers through the API and mints a token for the new account
    pub async fn register(&self, name: &str, role: UserRole) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let phone = self.phone();

        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "phoneCode": "+1",
                    "phone": phone,
                    "email": email,
                    "password": "correct horse battery",
                    "name": name,
                    "role": role.as_str(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        let id: Uuid = serde_json::from_value(body["userId"].clone()).unwrap();
        let household_id = body
            .get("householdId")
            .map(|v| serde_json::from_value(v.clone()).unwrap());

        TestUser {
            id,
            name: name.to_string(),
            email,
            phone: format!("+1{}", phone),
            token: self.token_for(id, role),
            household_id,
        }
    }

    pub fn token_for(&self, user_id: Uuid, role: UserRole) -> String {
        let claims = Claims::new(user_id, role, chrono::Duration::hours(1));
        create_token(&claims, TEST_SECRET).unwrap()
    }

    /// Invites `invitee` into `owner`'s household and returns the code
    pub async fn invite(&self, owner: &TestUser, invitee: &TestUser) -> String {
        let (status, body) = self
            .post(
                "/api/household/invite",
                Some(&owner.token),
                json!({ "email": invitee.email, "phone": invitee.phone }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {body}");

        body["invite"]["code"].as_str().unwrap().to_string()
    }

    /// Creates a recipe, overriding fields of a valid public payload
    pub async fn create_recipe(&self, token: &str, overrides: Value) -> (StatusCode, Value) {
        self.post("/api/recipes", Some(token), recipe_payload(overrides))
            .await
    }
}

/// A valid public recipe body with `overrides` merged on top
pub fn recipe_payload(overrides: Value) -> Value {
    let mut payload = json!({
        "title": "Tomato Soup",
        "description": "A quick weeknight soup with pantry staples.",
        "cuisine": "Italian",
        "tags": ["soup", "quick"],
        "ingredients": [
            { "name": "tomato", "quantity": 6, "unit": "pcs" },
            { "name": "basil", "quantity": 1, "unit": "bunch", "isOptional": true }
        ],
        "steps": [
            { "order": 1, "text": "Chop the tomatoes." },
            { "order": 2, "text": "Simmer for twenty minutes.", "timerSec": 1200 }
        ],
        "servings": 4,
        "prepTime": 10,
        "cookTime": 20,
        "isPublic": true
    });

    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), overrides) {
        for (key, value) in extra {
            base.insert(key, value);
        }
    }

    payload
}
