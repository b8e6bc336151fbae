pub mod auth_service;
pub mod login_attempt_recorder;
pub mod refresh_token_ledger;
pub mod token_service;
pub mod validation;

pub use auth_service::{AuthService, Stores};
