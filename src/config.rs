use std::time::Duration;
use std::{env, fmt};

use crate::keys::jwks::JwksConfig;
use crate::policy::ValidationPolicy;

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Startup configuration for the authentication core, loaded once at process
/// start.
///
/// - `AUTH_ISSUER` (required) — expected `iss` claim.
/// - `AUTH_AUDIENCE` (required) — audience this service accepts tokens for.
/// - `AUTH_CLOCK_SKEW_SECONDS` — default 0.
/// - `AUTH_REQUIRED_CLAIMS` — comma-separated, default empty.
/// - `AUTH_ROLE_CLAIM` — default `roles`.
/// - `AUTH_ROLE_PREFIX` — default `ROLE_`.
/// - `AUTH_JWKS_URI` — optional; when set, keys come from this endpoint.
/// - `AUTH_JWKS_TTL_SECONDS` / `AUTH_JWKS_TIMEOUT_SECONDS` — cache TTL
///   (default 600) and fetch timeout (default 5) for the JWKS source.
#[derive(Clone, Debug)]
pub struct Config {
    pub policy: ValidationPolicy,
    pub jwks: Option<JwksConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let issuer = env::var("AUTH_ISSUER").map_err(|_| ConfigError::Missing("AUTH_ISSUER"))?;
        let audience =
            env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::Missing("AUTH_AUDIENCE"))?;

        let mut policy = ValidationPolicy::new(issuer, audience);

        if let Ok(raw) = env::var("AUTH_CLOCK_SKEW_SECONDS") {
            let skew = parse_seconds(&raw).ok_or(ConfigError::Invalid("AUTH_CLOCK_SKEW_SECONDS"))?;
            policy = policy.with_clock_skew(skew);
        }
        if let Ok(raw) = env::var("AUTH_REQUIRED_CLAIMS") {
            policy = policy.with_required_claims(parse_claim_list(&raw));
        }
        if let Ok(claim) = env::var("AUTH_ROLE_CLAIM") {
            policy = policy.with_role_claim(claim);
        }
        if let Ok(prefix) = env::var("AUTH_ROLE_PREFIX") {
            policy = policy.with_role_prefix(prefix);
        }

        let jwks = match env::var("AUTH_JWKS_URI") {
            Ok(uri) if !uri.trim().is_empty() => {
                let mut jwks = JwksConfig::new(uri);
                if let Ok(raw) = env::var("AUTH_JWKS_TTL_SECONDS") {
                    jwks.cache_ttl =
                        parse_seconds(&raw).ok_or(ConfigError::Invalid("AUTH_JWKS_TTL_SECONDS"))?;
                }
                if let Ok(raw) = env::var("AUTH_JWKS_TIMEOUT_SECONDS") {
                    jwks.fetch_timeout = parse_seconds(&raw)
                        .ok_or(ConfigError::Invalid("AUTH_JWKS_TIMEOUT_SECONDS"))?;
                }
                Some(jwks)
            }
            _ => None,
        };

        Ok(Config { policy, jwks })
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_claim_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_accepts_plain_integers() {
        assert_eq!(parse_seconds("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_seconds(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_seconds("abc"), None);
        assert_eq!(parse_seconds("-1"), None);
    }

    #[test]
    fn parse_claim_list_trims_and_drops_empties() {
        assert_eq!(
            parse_claim_list("email, scope ,,sub"),
            vec!["email", "scope", "sub"]
        );
        assert!(parse_claim_list("").is_empty());
    }
}
