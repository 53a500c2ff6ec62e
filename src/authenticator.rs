//! The authentication pipeline: structural parse, key resolution, signature
//! verification, then semantic validation (temporal, issuer, audience,
//! required claims) and role extraction.
//!
//! The surrounding request layer extracts the bearer token, calls
//! [`TokenAuthenticator::authenticate`], attaches the resulting
//! [`Principal`] to the request context on success, and rejects the request
//! on failure. This crate never produces a response itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use tracing::{debug, warn};

use crate::audience::AudienceCheck;
use crate::claims::{RawClaims, TokenClaims};
use crate::error::AuthError;
use crate::keys::SigningKeySource;
use crate::policy::ValidationPolicy;
use crate::principal::Principal;

/// Extract the token from an `Authorization` header value using the Bearer
/// scheme. Returns `None` for any other scheme or an empty credential.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Validates bearer tokens against one policy and one key source.
///
/// Built explicitly at startup and shared by reference across requests; the
/// policy is immutable and the key source is internally synchronized, so one
/// value serves all concurrent validations.
pub struct TokenAuthenticator {
    policy: ValidationPolicy,
    audience: AudienceCheck,
    keys: Arc<dyn SigningKeySource>,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("policy", &self.policy)
            .finish()
    }
}

impl TokenAuthenticator {
    pub fn new(policy: ValidationPolicy, keys: Arc<dyn SigningKeySource>) -> Self {
        let audience = AudienceCheck::new(policy.expected_audience());
        Self {
            policy,
            audience,
            keys,
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Authenticate a raw bearer token, producing a [`Principal`] or a
    /// classified [`AuthError`].
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        self.authenticate_at(token, Utc::now()).await
    }

    /// Same as [`authenticate`](Self::authenticate) with an explicit
    /// verification time, so temporal boundaries are testable without a
    /// mock clock.
    pub async fn authenticate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        // Structural parse: three segments, decodable header.
        if token.split('.').count() != 3 {
            return Err(AuthError::MalformedToken);
        }
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "failed to decode token header");
            AuthError::MalformedToken
        })?;
        let key_id = header.kid.ok_or(AuthError::MalformedToken)?;

        // Key resolution by kid.
        let key = self.keys.resolve(&key_id).await?;

        // The header algorithm must match the algorithm bound to the
        // resolved key. Rejecting up front closes algorithm substitution:
        // a token claiming HS256 against a key registered as RS256 never
        // reaches signature verification.
        if header.alg != key.algorithm() {
            warn!(
                key_id = %key_id,
                header_alg = ?header.alg,
                bound_alg = ?key.algorithm(),
                "token algorithm does not match key binding"
            );
            return Err(AuthError::InvalidSignature);
        }

        // Signature verification only; temporal, issuer and audience checks
        // run below where each failure maps to its own variant.
        let mut validation = Validation::new(key.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();

        let raw: RawClaims = decode(token, key.decoding_key(), &validation)
            .map_err(|e| {
                debug!(key_id = %key_id, error = %e, "token verification failed");
                classify_decode_error(e)
            })?
            .claims;

        let skew = self.policy.clock_skew().as_secs() as i64;

        // Temporal validation, inclusive on both boundaries. Saturating
        // arithmetic: a signed token can still carry extreme timestamps,
        // and widening them by the skew must not overflow.
        let exp = raw.exp.ok_or_else(|| AuthError::missing_claim("exp"))?;
        if now.timestamp() > exp.saturating_add(skew) {
            return Err(AuthError::Expired);
        }
        for start in [raw.nbf, raw.iat].into_iter().flatten() {
            if now.timestamp() < start.saturating_sub(skew) {
                return Err(AuthError::NotYetValid);
            }
        }

        // Issuer: exact string equality, no normalization.
        let issuer = raw
            .iss
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AuthError::missing_claim("iss"))?;
        if issuer != self.policy.expected_issuer() {
            return Err(AuthError::IssuerMismatch {
                expected: self.policy.expected_issuer().to_string(),
            });
        }

        let subject = raw
            .sub
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AuthError::missing_claim("sub"))?;

        // Audience: set containment, not equality.
        let audience = raw.audience_set();
        self.audience.check(&audience)?;

        for claim in self.policy.required_claims() {
            if !raw.claim_is_present(claim) {
                return Err(AuthError::missing_claim(claim.clone()));
            }
        }

        // Roles: absence is a valid, low-privilege state.
        let raw_roles = raw.role_values(self.policy.role_claim());
        let roles: BTreeSet<String> = raw_roles
            .iter()
            .map(|role| self.policy.normalize_role(role))
            .collect();

        let claims = TokenClaims::new(
            subject.clone(),
            issuer,
            audience,
            raw.iat.and_then(|iat| Utc.timestamp_opt(iat, 0).single()),
            Utc.timestamp_opt(exp, 0)
                .single()
                .ok_or(AuthError::MalformedToken)?,
            raw_roles,
            raw.extra,
        );

        debug!(subject = %subject, key_id = %key_id, "token accepted");
        Ok(Principal::new(subject, roles, claims))
    }
}

fn classify_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
            AuthError::MalformedToken
        }
        // Disabled in our Validation, but mapped in case the library checks
        // them anyway.
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        // Everything else is a crypto-level rejection; fail closed.
        _ => AuthError::InvalidSignature,
    }
}
