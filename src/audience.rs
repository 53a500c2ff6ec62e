use std::collections::BTreeSet;

use crate::error::AuthError;

/// Audience check: the expected audience must be an element of the token's
/// audience set. Exact string membership only; no partial matching, no
/// case folding. A token may list several intended audiences, so this is
/// containment, not equality.
#[derive(Debug, Clone)]
pub struct AudienceCheck {
    expected: String,
}

impl AudienceCheck {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn check(&self, audience: &BTreeSet<String>) -> Result<(), AuthError> {
        if audience.contains(self.expected.as_str()) {
            Ok(())
        } else {
            Err(AuthError::AudienceMismatch {
                expected: self.expected.clone(),
            })
        }
    }
}
