/// API route handlers, one module per resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `household`: Invitations and joining
/// - `recipes`: Recipe reads, creation and search
/// - `users`: Preferences, profile and favorites

pub mod auth;
pub mod health;
pub mod household;
pub mod recipes;
pub mod users;
