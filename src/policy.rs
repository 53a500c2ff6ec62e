use std::time::Duration;

/// Validation rules shared by every authentication call.
///
/// Built once at startup (directly or via [`crate::config::Config::from_env`])
/// and passed into [`crate::TokenAuthenticator`]; immutable afterwards, so it
/// needs no synchronization when shared across concurrent requests.
#[derive(Clone, Debug)]
pub struct ValidationPolicy {
    expected_issuer: String,
    expected_audience: String,
    clock_skew: Duration,
    required_claims: Vec<String>,
    role_claim: String,
    role_prefix: String,
}

pub const DEFAULT_ROLE_CLAIM: &str = "roles";
pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

impl ValidationPolicy {
    /// Policy with defaults: zero clock skew, no extra required claims,
    /// roles read from the `roles` claim and prefixed with `ROLE_`.
    pub fn new(expected_issuer: impl Into<String>, expected_audience: impl Into<String>) -> Self {
        Self {
            expected_issuer: expected_issuer.into(),
            expected_audience: expected_audience.into(),
            clock_skew: Duration::ZERO,
            required_claims: Vec::new(),
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
            role_prefix: DEFAULT_ROLE_PREFIX.to_string(),
        }
    }

    /// Widen the tolerated clock difference between issuer and verifier.
    /// Default is zero; widening is an explicit opt-in.
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Claims that must be present and non-empty beyond the standard set
    /// (`iss`, `sub`, `exp` are always enforced).
    pub fn with_required_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role_claim(mut self, claim: impl Into<String>) -> Self {
        self.role_claim = claim.into();
        self
    }

    pub fn with_role_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_prefix = prefix.into();
        self
    }

    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }

    pub fn expected_audience(&self) -> &str {
        &self.expected_audience
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    pub fn role_claim(&self) -> &str {
        &self.role_claim
    }

    pub fn role_prefix(&self) -> &str {
        &self.role_prefix
    }

    /// Apply the role prefix unless the raw value already carries it.
    pub fn normalize_role(&self, raw: &str) -> String {
        if self.role_prefix.is_empty() || raw.starts_with(&self.role_prefix) {
            raw.to_string()
        } else {
            format!("{}{}", self.role_prefix, raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = ValidationPolicy::new("https://issuer.example.com", "payment-api");
        assert_eq!(policy.expected_issuer(), "https://issuer.example.com");
        assert_eq!(policy.expected_audience(), "payment-api");
        assert_eq!(policy.clock_skew(), Duration::ZERO);
        assert_eq!(policy.role_claim(), "roles");
        assert_eq!(policy.role_prefix(), "ROLE_");
        assert!(policy.required_claims().is_empty());
    }

    #[test]
    fn normalize_role_applies_prefix_once() {
        let policy = ValidationPolicy::new("iss", "aud");
        assert_eq!(policy.normalize_role("admin"), "ROLE_admin");
        assert_eq!(policy.normalize_role("ROLE_admin"), "ROLE_admin");
    }

    #[test]
    fn normalize_role_with_empty_prefix_is_identity() {
        let policy = ValidationPolicy::new("iss", "aud").with_role_prefix("");
        assert_eq!(policy.normalize_role("admin"), "admin");
    }
}
