use thiserror::Error;

/// Classified failures of bearer-token authentication.
///
/// Every variant is terminal for the request being authenticated. The only
/// internal retry is one bounded re-fetch of the remote key set on
/// `KeyFetchFailed`/`KeyFetchTimeout`; everything else surfaces immediately.
///
/// Messages carry the failed check and, where safe, the expected value.
/// They never include raw token contents or key material.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong segment count, invalid encoding, or an unusable header.
    #[error("malformed token")]
    MalformedToken,

    /// No verification key is registered under the token's key id.
    #[error("no verification key for kid '{key_id}'")]
    UnknownKey { key_id: String },

    /// Signature verification failed, or the header algorithm does not match
    /// the algorithm bound to the resolved key.
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("issuer mismatch (expected '{expected}')")]
    IssuerMismatch { expected: String },

    /// Wording mirrors the diagnostic the surrounding layer logs on 401s.
    #[error("the required audience '{expected}' is missing")]
    AudienceMismatch { expected: String },

    #[error("missing or empty claim '{claim}'")]
    MissingClaim { claim: String },

    #[error("key set fetch timed out")]
    KeyFetchTimeout,

    #[error("key set fetch failed: {0}")]
    KeyFetchFailed(String),
}

impl AuthError {
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        AuthError::MissingClaim {
            claim: claim.into(),
        }
    }
}
