/// Recipe model and database operations
///
/// Ingredients, steps and nutrition are stored as JSONB documents. A recipe
/// must be public or belong to a household; the `recipes_visibility` check
/// constraint enforces it.
///
/// # Example
///
/// ```no_run
/// use hearth_shared::models::recipe::{Recipe, RecipeFilter};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = RecipeFilter {
///     query: Some("tomato soup".to_string()),
///     ..RecipeFilter::default()
/// };
///
/// let page = Recipe::list(&pool, &filter).await?;
/// println!("{} of {} recipes", page.items.len(), page.total);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::user::DietType;
use crate::auth::authorization::{listing_visible, Viewer};

const RECIPE_COLUMNS: &str = "id, title, description, cuisine, tags, diet_tags, allergens, \
     ingredients, steps, servings, prep_time, cook_time, nutrition, cover_image, images, \
     video_url, created_by, household_id, source, is_public, status, verified, \
     favorites_count, rating_average, rating_count, slug, created_at, updated_at";

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller can request
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipe_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipe_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    #[default]
    User,
    Ai,
    Curated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position
    pub order: u32,
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub timer_sec: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fats: Option<f64>,
}

/// A stored recipe
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cuisine: String,
    pub tags: Vec<String>,
    pub diet_tags: Vec<DietType>,
    pub allergens: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub servings: i32,
    pub prep_time: i32,
    pub cook_time: i32,
    /// prep_time + cook_time
    pub total_time: i32,
    pub nutrition: Nutrition,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub created_by: Uuid,
    #[serde(rename = "household")]
    pub household_id: Option<Uuid>,
    pub source: RecipeSource,
    pub is_public: bool,
    pub status: RecipeStatus,
    pub verified: bool,
    pub favorites_count: i32,
    pub rating_average: f64,
    pub rating_count: i32,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn is_public_and_published(&self) -> bool {
        self.is_public && self.status == RecipeStatus::Published
    }

    /// Text indexed for search: title, description and ingredient names
    pub fn search_document(&self) -> String {
        search_document(&self.title, &self.description, &self.ingredients)
    }

    /// Whether every word of `query` is a whole word of the search
    /// document, ignoring case
    ///
    /// Postgres additionally stems both sides, so "tomatoes" finds "Tomato"
    /// there but not here. Neither matches partial words.
    pub fn matches_query(&self, query: &str) -> bool {
        let document = self.search_document().to_lowercase();
        let words: Vec<&str> = search_words(&document).collect();
        let query = query.to_lowercase();
        let mut terms = search_words(&query).peekable();

        terms.peek().is_some() && terms.all(|term| words.contains(&term))
    }
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: Uuid,
    title: String,
    description: String,
    cuisine: String,
    tags: Vec<String>,
    diet_tags: Vec<DietType>,
    allergens: Vec<String>,
    ingredients: Json<Vec<Ingredient>>,
    steps: Json<Vec<Step>>,
    servings: i32,
    prep_time: i32,
    cook_time: i32,
    nutrition: Json<Nutrition>,
    cover_image: Option<String>,
    images: Vec<String>,
    video_url: Option<String>,
    created_by: Uuid,
    household_id: Option<Uuid>,
    source: RecipeSource,
    is_public: bool,
    status: RecipeStatus,
    verified: bool,
    favorites_count: i32,
    rating_average: f64,
    rating_count: i32,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            title: row.title,
            description: row.description,
            cuisine: row.cuisine,
            tags: row.tags,
            diet_tags: row.diet_tags,
            allergens: row.allergens,
            ingredients: row.ingredients.0,
            steps: row.steps.0,
            servings: row.servings,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            total_time: row.prep_time.saturating_add(row.cook_time),
            nutrition: row.nutrition.0,
            cover_image: row.cover_image,
            images: row.images,
            video_url: row.video_url,
            created_by: row.created_by,
            household_id: row.household_id,
            source: row.source,
            is_public: row.is_public,
            status: row.status,
            verified: row.verified,
            favorites_count: row.favorites_count,
            rating_average: row.rating_average,
            rating_count: row.rating_count,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a recipe (already validated)
#[derive(Debug, Clone)]
pub struct CreateRecipe {
    pub title: String,
    pub description: String,
    pub cuisine: String,
    pub tags: Vec<String>,
    pub diet_tags: Vec<DietType>,
    pub allergens: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub servings: i32,
    pub prep_time: i32,
    pub cook_time: i32,
    pub nutrition: Nutrition,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub created_by: Uuid,
    pub household_id: Option<Uuid>,
    pub source: RecipeSource,
    pub is_public: bool,
    pub status: RecipeStatus,
    pub slug: String,
}

/// How a single recipe is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeKey {
    Id(Uuid),
    Slug(String),
}

impl RecipeKey {
    /// A UUID-shaped value is an ID, anything else a slug
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => RecipeKey::Id(id),
            Err(_) => RecipeKey::Slug(raw.to_string()),
        }
    }
}

/// Listing filters and paging
#[derive(Debug, Clone)]
pub struct RecipeFilter {
    /// Free-text query; every term must match
    pub query: Option<String>,
    pub household_id: Option<Uuid>,
    pub is_public: Option<bool>,
    /// Authenticated caller; None lists public, published recipes only
    pub viewer: Option<Viewer>,
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            query: None,
            household_id: None,
            is_public: None,
            viewer: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RecipeFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Applies every filter except paging
    pub fn admits(&self, recipe: &Recipe) -> bool {
        if let Some(household_id) = self.household_id {
            if recipe.household_id != Some(household_id) {
                return false;
            }
        }
        if let Some(is_public) = self.is_public {
            if recipe.is_public != is_public {
                return false;
            }
        }
        if let Some(query) = &self.query {
            if !recipe.matches_query(query) {
                return false;
            }
        }
        listing_visible(recipe, self.viewer.as_ref())
    }

    fn push_conditions<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push(" WHERE TRUE");

        if let Some(query) = &self.query {
            builder
                .push(" AND to_tsvector('english', search_text) @@ plainto_tsquery('english', ")
                .push_bind(query.as_str())
                .push(")");
        }
        if let Some(household_id) = self.household_id {
            builder.push(" AND household_id = ").push_bind(household_id);
        }
        if let Some(is_public) = self.is_public {
            builder.push(" AND is_public = ").push_bind(is_public);
        }

        builder.push(" AND ((is_public AND status = 'published')");
        if let Some(viewer) = &self.viewer {
            builder.push(" OR created_by = ").push_bind(viewer.user_id);
            if let Some(household_id) = viewer.household_id {
                builder.push(" OR household_id = ").push_bind(household_id);
            }
        }
        builder.push(")");
    }
}

/// One page of a listing plus the total match count
#[derive(Debug, Clone)]
pub struct RecipePage {
    pub items: Vec<Recipe>,
    pub total: u64,
}

fn search_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Builds the indexed search text
pub fn search_document(title: &str, description: &str, ingredients: &[Ingredient]) -> String {
    let mut document = format!("{} {}", title, description);
    for ingredient in ingredients {
        document.push(' ');
        document.push_str(&ingredient.name);
    }
    document
}

/// Lowercase ASCII alphanumerics with other runs collapsed to `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Slug from the title plus a 6-hex-char random suffix
pub fn generate_slug(title: &str) -> String {
    let mut suffix = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut suffix);

    let base = slugify(title);
    let base = if base.is_empty() { "recipe".to_string() } else { base };
    format!("{}-{}", base, hex::encode(suffix))
}

impl Recipe {
    /// Inserts a recipe
    ///
    /// # Errors
    ///
    /// A duplicate slug violates `recipes_slug_key`.
    pub async fn create<'e, E>(executor: E, data: CreateRecipe) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let search_text = search_document(&data.title, &data.description, &data.ingredients);

        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "INSERT INTO recipes (title, description, cuisine, tags, diet_tags, allergens, \
                 ingredients, steps, servings, prep_time, cook_time, nutrition, cover_image, \
                 images, video_url, created_by, household_id, source, is_public, status, slug, \
                 search_text) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19, $20, $21, $22) \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.cuisine)
        .bind(data.tags)
        .bind(data.diet_tags)
        .bind(data.allergens)
        .bind(Json(data.ingredients))
        .bind(Json(data.steps))
        .bind(data.servings)
        .bind(data.prep_time)
        .bind(data.cook_time)
        .bind(Json(data.nutrition))
        .bind(data.cover_image)
        .bind(data.images)
        .bind(data.video_url)
        .bind(data.created_by)
        .bind(data.household_id)
        .bind(data.source)
        .bind(data.is_public)
        .bind(data.status)
        .bind(data.slug)
        .bind(search_text)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(Recipe::from))
    }

    pub async fn find_by_slug<'e, E>(executor: E, slug: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(Recipe::from))
    }

    /// Lists recipes newest first
    pub async fn list(pool: &PgPool, filter: &RecipeFilter) -> Result<RecipePage, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes");
        filter.push_conditions(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes"));
        filter.push_conditions(&mut select);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        let rows: Vec<RecipeRow> = select.build_query_as().fetch_all(pool).await?;

        Ok(RecipePage {
            items: rows.into_iter().map(Recipe::from).collect(),
            total: total.max(0) as u64,
        })
    }

    /// Shifts the favorites counter, never below zero
    pub async fn adjust_favorites_count<'e, E>(
        executor: E,
        id: Uuid,
        delta: i32,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET favorites_count = GREATEST(favorites_count + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
