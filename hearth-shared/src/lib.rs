//! # Hearth Shared Library
//!
//! Types, persistence and auth primitives used by the Hearth API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `store`: Persistence port with Postgres and in-memory implementations
//! - `auth`: Password hashing, JWT sessions, identity middleware, authorization policy
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the Hearth shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
