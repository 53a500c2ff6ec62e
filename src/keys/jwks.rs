//! Remote key set (JWKS) source with a TTL cache.
//!
//! Resolution is read-mostly: the common path is a shared read of the cached
//! key map. A miss (cold cache, expired TTL, or unknown kid after rotation)
//! funnels through a single-flight refresh so N concurrent misses cost one
//! upstream fetch. A minimum refresh interval keeps unknown-kid storms from
//! hammering the issuer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{SigningKeySource, VerificationKey};
use crate::error::AuthError;

/// Settings for a [`JwksKeySource`].
#[derive(Clone, Debug)]
pub struct JwksConfig {
    pub jwks_uri: String,
    /// How long a fetched key set stays fresh.
    pub cache_ttl: Duration,
    /// Upper bound on a single upstream fetch.
    pub fetch_timeout: Duration,
    /// Floor between consecutive upstream fetches, whatever triggered them.
    pub min_refresh_interval: Duration,
}

impl JwksConfig {
    /// Defaults: 10 minute TTL, 5 second fetch timeout, 10 second refresh floor.
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            cache_ttl: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(5),
            min_refresh_interval: Duration::from_secs(10),
        }
    }
}

struct CachedKeys {
    keys: HashMap<String, Arc<VerificationKey>>,
    fetched_at: Instant,
}

/// Key source backed by a standard JWK Set endpoint.
pub struct JwksKeySource {
    config: JwksConfig,
    http: reqwest::Client,
    // Whole-map swap on refresh; readers never see a partially built set.
    cache: RwLock<Option<CachedKeys>>,
    // Single-flight gate for the fetch-and-populate path.
    refresh_gate: Mutex<()>,
    last_attempt: RwLock<Option<Instant>>,
}

impl std::fmt::Debug for JwksKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeySource")
            .field("jwks_uri", &self.config.jwks_uri)
            .field("cache_ttl", &self.config.cache_ttl)
            .finish()
    }
}

impl JwksKeySource {
    pub fn new(config: JwksConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| AuthError::KeyFetchFailed(format!("http client: {e}")))?;

        Ok(Self {
            config,
            http,
            cache: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            last_attempt: RwLock::new(None),
        })
    }

    pub fn jwks_uri(&self) -> &str {
        &self.config.jwks_uri
    }

    async fn cached(&self, key_id: &str) -> Option<Arc<VerificationKey>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() >= self.config.cache_ttl {
            return None;
        }
        cached.keys.get(key_id).cloned()
    }

    /// Refresh the cached key set, coalescing concurrent callers.
    ///
    /// The gate is only held by refreshers; readers go through the `RwLock`
    /// and never wait on an in-flight fetch they did not trigger. If the
    /// fetch future is cancelled the gate is simply released and the cache
    /// keeps its previous contents.
    async fn refresh(&self) -> Result<(), AuthError> {
        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate.
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.fetched_at.elapsed() < self.config.min_refresh_interval
            {
                return Ok(());
            }
        }

        // Rate-limit failed attempts too, so a kid that never appears cannot
        // turn every request into an upstream fetch.
        {
            let last = self.last_attempt.read().await;
            if let Some(at) = *last
                && at.elapsed() < self.config.min_refresh_interval
            {
                debug!(jwks_uri = %self.config.jwks_uri, "key set refresh rate limited");
                return Ok(());
            }
        }
        *self.last_attempt.write().await = Some(Instant::now());

        // One bounded retry before surfacing the failure.
        let keys = match self.fetch_key_set().await {
            Ok(keys) => keys,
            Err(first) => {
                warn!(
                    jwks_uri = %self.config.jwks_uri,
                    error = %first,
                    "key set fetch failed, retrying once"
                );
                self.fetch_key_set().await?
            }
        };

        info!(
            jwks_uri = %self.config.jwks_uri,
            key_count = keys.len(),
            "refreshed key set"
        );

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    async fn fetch_key_set(&self) -> Result<HashMap<String, Arc<VerificationKey>>, AuthError> {
        let response = self
            .http
            .get(&self.config.jwks_uri)
            .send()
            .await
            .map_err(fetch_error)?;

        if !response.status().is_success() {
            return Err(AuthError::KeyFetchFailed(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(fetch_error)?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                warn!(jwks_uri = %self.config.jwks_uri, "skipping JWK without kid");
                continue;
            };
            let Some(algorithm) = bound_algorithm(jwk) else {
                warn!(key_id = %kid, "skipping JWK with no usable signing algorithm");
                continue;
            };
            let decoding_key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    warn!(key_id = %kid, error = %e, "skipping unusable JWK");
                    continue;
                }
            };
            keys.insert(
                kid.clone(),
                Arc::new(VerificationKey::new(kid, algorithm, decoding_key)),
            );
        }

        Ok(keys)
    }
}

fn fetch_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::KeyFetchTimeout
    } else {
        AuthError::KeyFetchFailed(e.to_string())
    }
}

/// The signing algorithm a JWK is bound to: its `alg` member when present,
/// otherwise inferred from the key type.
fn bound_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if let Some(alg) = jwk.common.key_algorithm {
        return match alg {
            KeyAlgorithm::HS256 => Some(Algorithm::HS256),
            KeyAlgorithm::HS384 => Some(Algorithm::HS384),
            KeyAlgorithm::HS512 => Some(Algorithm::HS512),
            KeyAlgorithm::RS256 => Some(Algorithm::RS256),
            KeyAlgorithm::RS384 => Some(Algorithm::RS384),
            KeyAlgorithm::RS512 => Some(Algorithm::RS512),
            KeyAlgorithm::PS256 => Some(Algorithm::PS256),
            KeyAlgorithm::PS384 => Some(Algorithm::PS384),
            KeyAlgorithm::PS512 => Some(Algorithm::PS512),
            KeyAlgorithm::ES256 => Some(Algorithm::ES256),
            KeyAlgorithm::ES384 => Some(Algorithm::ES384),
            KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
            // Encryption algorithms are not signing algorithms.
            _ => None,
        };
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            _ => None,
        },
        AlgorithmParameters::OctetKeyPair(params) => match params.curve {
            EllipticCurve::Ed25519 => Some(Algorithm::EdDSA),
            _ => None,
        },
        AlgorithmParameters::OctetKey(_) => Some(Algorithm::HS256),
    }
}

#[async_trait]
impl SigningKeySource for JwksKeySource {
    async fn resolve(&self, key_id: &str) -> Result<Arc<VerificationKey>, AuthError> {
        if let Some(key) = self.cached(key_id).await {
            debug!(key_id = %key_id, "key resolved from cache");
            return Ok(key);
        }

        // Cold cache, expired TTL, or a kid we have never seen (rotation).
        self.refresh().await?;

        self.cached(key_id)
            .await
            .ok_or_else(|| AuthError::UnknownKey {
                key_id: key_id.to_string(),
            })
    }
}
