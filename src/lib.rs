//! Framework-free JWT bearer authentication core.
//!
//! Validates a bearer token's signature, issuer, audience and expiry, and
//! derives an authenticated [`Principal`] (subject + normalized role set)
//! from its claims. HTTP routing, CORS, sessions and persistence are the
//! surrounding layer's business; this crate only turns a token string into a
//! principal or a classified [`AuthError`].
//!
//! Wiring is explicit: build a [`ValidationPolicy`] and a key source once at
//! startup (from code or [`Config::from_env`]) and share one
//! [`TokenAuthenticator`] across requests.
//!
//! ```no_run
//! use std::sync::Arc;
//! use zerotrust_auth::{
//!     JwksConfig, JwksKeySource, TokenAuthenticator, ValidationPolicy,
//! };
//!
//! # async fn demo(token: &str) -> Result<(), zerotrust_auth::AuthError> {
//! let policy = ValidationPolicy::new("https://issuer.example.com", "payment-api");
//! let keys = JwksKeySource::new(JwksConfig::new("https://issuer.example.com/jwks"))?;
//! let authenticator = TokenAuthenticator::new(policy, Arc::new(keys));
//!
//! let principal = authenticator.authenticate(token).await?;
//! assert!(principal.has_role("ROLE_user") || principal.roles().is_empty());
//! # Ok(())
//! # }
//! ```

mod audience;
mod authenticator;
mod claims;
mod config;
mod error;
mod keys;
mod policy;
mod principal;
mod user;

pub use audience::AudienceCheck;
pub use authenticator::{TokenAuthenticator, bearer_token};
pub use claims::TokenClaims;
pub use config::{Config, ConfigError};
pub use error::AuthError;
pub use keys::jwks::{JwksConfig, JwksKeySource};
pub use keys::{SigningKeySource, StaticKeys, VerificationKey};
pub use policy::{DEFAULT_ROLE_CLAIM, DEFAULT_ROLE_PREFIX, ValidationPolicy};
pub use principal::Principal;
pub use user::{
    DEFAULT_USER_ROLE, DirectoryError, InMemoryUserDirectory, User, UserDirectory,
    load_or_create_user,
};

pub use jsonwebtoken::{Algorithm, DecodingKey};
