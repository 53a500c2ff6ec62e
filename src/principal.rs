use std::collections::BTreeSet;

use crate::claims::TokenClaims;

/// The authenticated identity derived from a validated token.
///
/// Created once per successful validation, immutable, and scoped to a single
/// request; the surrounding request layer attaches it to the request context
/// for downstream authorization checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    subject: String,
    roles: BTreeSet<String>,
    claims: TokenClaims,
}

impl Principal {
    pub(crate) fn new(subject: String, roles: BTreeSet<String>, claims: TokenClaims) -> Self {
        Self {
            subject,
            roles,
            claims,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Normalized role set (role prefix applied). Empty for tokens without
    /// a roles claim.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// The verified claims this principal was derived from, read-only.
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }
}
