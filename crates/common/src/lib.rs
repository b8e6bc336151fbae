//! Types and helpers shared by the auth service and its test utilities.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, clock skew, header parsing)
pub mod jwt;
