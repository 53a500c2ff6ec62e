use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Claims exactly as they appear on the wire, before any semantic checks.
///
/// NOTE:
/// - `aud` can be either a string or an array of strings (RFC 7519), so it is
///   kept as a raw `Value` until [`RawClaims::audience_set`] runs.
/// - A missing claim deserializes to `None`/`Null` via `#[serde(default)]`;
///   presence checks happen in the authenticator, not here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub aud: Value,

    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Everything else, including the configurable roles claim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawClaims {
    /// Audience as a set. Membership, not equality, is what gets checked
    /// downstream: a token may list several intended audiences.
    pub fn audience_set(&self) -> BTreeSet<String> {
        match &self.aud {
            Value::String(s) if !s.trim().is_empty() => BTreeSet::from([s.clone()]),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Role values under `claim`, un-normalized. Absence is not an error:
    /// a token without roles is a valid, low-privilege token.
    ///
    /// Accepts an array of strings or a single space-separated string, the
    /// two shapes identity providers emit for authority claims.
    pub fn role_values(&self, claim: &str) -> BTreeSet<String> {
        match self.extra.get(claim) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Present *and* non-empty: `null`, `""`, `[]` and `{}` all count as
    /// missing for the required-claims check.
    pub fn claim_is_present(&self, claim: &str) -> bool {
        fn non_empty(value: &Value) -> bool {
            match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
                Value::Bool(_) | Value::Number(_) => true,
            }
        }

        match claim {
            "iss" => self.iss.as_deref().is_some_and(|s| !s.trim().is_empty()),
            "sub" => self.sub.as_deref().is_some_and(|s| !s.trim().is_empty()),
            "aud" => !self.audience_set().is_empty(),
            "exp" => self.exp.is_some(),
            "iat" => self.iat.is_some(),
            "nbf" => self.nbf.is_some(),
            other => self.extra.get(other).is_some_and(non_empty),
        }
    }
}

/// The decoded, verified payload of an accepted token.
///
/// Only constructed by the authenticator after signature, temporal, issuer,
/// audience and required-claims validation have all passed; there is no
/// public constructor, so holding a `TokenClaims` implies the token was good.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    subject: String,
    issuer: String,
    audience: BTreeSet<String>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    roles: BTreeSet<String>,
    extra: serde_json::Map<String, Value>,
}

impl TokenClaims {
    pub(crate) fn new(
        subject: String,
        issuer: String,
        audience: BTreeSet<String>,
        issued_at: Option<DateTime<Utc>>,
        expires_at: DateTime<Utc>,
        roles: BTreeSet<String>,
        extra: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            subject,
            issuer,
            audience,
            issued_at,
            expires_at,
            roles,
            extra,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &BTreeSet<String> {
        &self.audience
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Raw role values from the roles claim, before prefix normalization.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Any non-standard claim by name.
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.extra.get(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(payload: Value) -> RawClaims {
        serde_json::from_value(payload).expect("raw claims")
    }

    #[test]
    fn audience_accepts_string_and_array() {
        let single = raw(json!({ "aud": "payment-api" }));
        assert_eq!(single.audience_set(), BTreeSet::from(["payment-api".into()]));

        let multi = raw(json!({ "aud": ["payment-api", "other-service"] }));
        assert_eq!(
            multi.audience_set(),
            BTreeSet::from(["payment-api".into(), "other-service".into()])
        );
    }

    #[test]
    fn audience_missing_or_blank_is_empty() {
        assert!(raw(json!({})).audience_set().is_empty());
        assert!(raw(json!({ "aud": "" })).audience_set().is_empty());
        assert!(raw(json!({ "aud": [42] })).audience_set().is_empty());
    }

    #[test]
    fn roles_from_array_and_space_separated_string() {
        let array = raw(json!({ "roles": ["admin", "user"] }));
        assert_eq!(
            array.role_values("roles"),
            BTreeSet::from(["admin".into(), "user".into()])
        );

        let string = raw(json!({ "roles": "admin user" }));
        assert_eq!(
            string.role_values("roles"),
            BTreeSet::from(["admin".into(), "user".into()])
        );
    }

    #[test]
    fn roles_absent_is_empty_set() {
        assert!(raw(json!({})).role_values("roles").is_empty());
        assert!(raw(json!({ "roles": null })).role_values("roles").is_empty());
    }

    #[test]
    fn claim_presence_treats_empty_values_as_missing() {
        let claims = raw(json!({
            "iss": "https://issuer.example.com",
            "sub": "user-1",
            "exp": 1_700_000_000,
            "email": "a@example.com",
            "scope": "",
            "groups": [],
        }));

        assert!(claims.claim_is_present("iss"));
        assert!(claims.claim_is_present("sub"));
        assert!(claims.claim_is_present("exp"));
        assert!(claims.claim_is_present("email"));
        assert!(!claims.claim_is_present("scope"));
        assert!(!claims.claim_is_present("groups"));
        assert!(!claims.claim_is_present("aud"));
        assert!(!claims.claim_is_present("nonexistent"));
    }
}
