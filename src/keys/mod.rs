pub mod jwks;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};

use crate::error::AuthError;

/// Public key material bound to a key id and a single signing algorithm.
///
/// The binding is what defeats algorithm substitution: a token's header must
/// name exactly this algorithm for this kid, whatever the header claims.
#[derive(Clone)]
pub struct VerificationKey {
    key_id: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

// Do not print key material
impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl VerificationKey {
    pub fn new(key_id: impl Into<String>, algorithm: Algorithm, decoding_key: DecodingKey) -> Self {
        Self {
            key_id: key_id.into(),
            algorithm,
            decoding_key,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Where verification keys come from: a pinned in-memory set, a JWKS
/// endpoint, or anything else that can look up key material by kid.
///
/// Lookups must be idempotent and side-effect-free from the caller's point
/// of view; implementations may populate an internal read-through cache, but
/// never mutate observable state on read.
#[async_trait]
pub trait SigningKeySource: Send + Sync {
    async fn resolve(&self, key_id: &str) -> Result<Arc<VerificationKey>, AuthError>;
}

/// Fixed key set known at startup. Suits services whose trusted keys are
/// pinned through configuration, and tests.
#[derive(Debug, Default)]
pub struct StaticKeys {
    keys: HashMap<String, Arc<VerificationKey>>,
}

impl StaticKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: VerificationKey) -> Self {
        self.keys.insert(key.key_id().to_string(), Arc::new(key));
        self
    }
}

#[async_trait]
impl SigningKeySource for StaticKeys {
    async fn resolve(&self, key_id: &str) -> Result<Arc<VerificationKey>, AuthError> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey {
                key_id: key_id.to_string(),
            })
    }
}
