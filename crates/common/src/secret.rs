//! Secret types for credentials that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every crate in the workspace wraps plaintext
//! passwords, bearer tokens, and private key material the same way.
//! `Debug` on these types is redacted, so a `#[derive(Debug)]` request struct
//! holding a password is safe to pass to `tracing`.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     email: "a@x.com".to_string(),
//!     password: SecretString::from("pw"),
//! };
//! assert!(!format!("{form:?}").contains("\"pw\""));
//! assert_eq!(form.password.expose_secret(), "pw");
//! ```
//!
//! Use `SecretString` for passwords and issued tokens, `SecretBox<[u8]>` for
//! binary key material.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
