//! # Kutubxona Shared Library
//!
//! This crate contains the domain types, persistence layer, and access-control
//! rules used by the Kutubxona API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, sessions, and role-based authorization
//! - `db`: SQLite connection pool, migrations, and bootstrap seeding
//! - `storage`: Upload directory management (sanitized, collision-free filenames)

pub mod auth;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the Kutubxona shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
