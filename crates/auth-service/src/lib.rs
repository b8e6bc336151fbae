//! Auth Service Library
//!
//! Account registration, password login and RS256 token sessions with
//! one-time-use refresh token rotation.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Key material, JWT signing/verification, password hashing
//! - `errors` - Error types, one per operation
//! - `handlers` - HTTP request handlers
//! - `models` - Data models
//! - `observability` - Metrics and log correlation
//! - `repositories` - Storage collaborators (PostgreSQL and in-memory)
//! - `routes` - HTTP router
//! - `services` - Business logic layer

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
