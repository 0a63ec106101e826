/// Database models for Hearth
///
/// Each model owns its SQL: associated functions take any `PgExecutor`, so
/// the same call works against the pool or inside a transaction.
///
/// # Models
///
/// - `user`: Accounts, preferences and favorites
/// - `household`: Groups of users sharing recipes
/// - `invitation`: Codes that let a user join a household
/// - `recipe`: Recipes, their search text and listing filters

pub mod household;
pub mod invitation;
pub mod recipe;
pub mod user;
