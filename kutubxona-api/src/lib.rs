//! # Kutubxona API Server Library
//!
//! This library provides the HTTP layer of Kutubxona, a small library of
//! shared books, apps, images and videos with role-based administration.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and redirect-with-flash responses
//! - `flash`: One-shot flash messages and JSON pages
//! - `middleware`: Role guards and security headers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod routes;
