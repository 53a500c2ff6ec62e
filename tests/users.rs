//! Find-or-register flow driven by real authenticated principals.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{Value, json};
use zerotrust_auth::{
    DEFAULT_USER_ROLE, InMemoryUserDirectory, Principal, StaticKeys, TokenAuthenticator,
    ValidationPolicy, VerificationKey, load_or_create_user,
};

const SECRET: &[u8] = b"user-flow-secret";
const ISSUER: &str = "https://issuer.example.com";
const AUDIENCE: &str = "payment-api";

fn authenticator() -> TokenAuthenticator {
    let keys = StaticKeys::new().with_key(VerificationKey::new(
        "k1",
        Algorithm::HS256,
        DecodingKey::from_secret(SECRET),
    ));
    TokenAuthenticator::new(ValidationPolicy::new(ISSUER, AUDIENCE), Arc::new(keys))
}

async fn principal_for(extra: Value) -> Principal {
    let mut claims = json!({
        "iss": ISSUER,
        "sub": "user-123",
        "aud": AUDIENCE,
        "exp": Utc::now().timestamp() + 300,
    });
    claims
        .as_object_mut()
        .unwrap()
        .extend(extra.as_object().unwrap().clone());

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".to_string());
    let token =
        jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap();
    authenticator().authenticate(&token).await.expect("valid token")
}

#[tokio::test]
async fn first_sight_registers_with_profile_and_roles() {
    let directory = InMemoryUserDirectory::new();
    let principal = principal_for(json!({
        "email": "jane@example.com",
        "given_name": "Jane",
        "family_name": "Doe",
        "roles": ["admin"],
    }))
    .await;

    let user = load_or_create_user(&directory, &principal).await.unwrap();
    assert_eq!(user.subject, "user-123");
    assert_eq!(user.email.as_deref(), Some("jane@example.com"));
    assert_eq!(user.given_name.as_deref(), Some("Jane"));
    assert_eq!(user.roles, BTreeSet::from(["ROLE_admin".to_string()]));
}

#[tokio::test]
async fn roleless_token_gets_the_default_role() {
    let directory = InMemoryUserDirectory::new();
    let principal = principal_for(json!({})).await;

    let user = load_or_create_user(&directory, &principal).await.unwrap();
    assert_eq!(user.roles, BTreeSet::from([DEFAULT_USER_ROLE.to_string()]));
}

#[tokio::test]
async fn returning_user_keeps_identity_and_refreshes_profile() {
    let directory = InMemoryUserDirectory::new();

    let first = principal_for(json!({ "given_name": "Jane" })).await;
    let created = load_or_create_user(&directory, &first).await.unwrap();

    let second = principal_for(json!({ "given_name": "Janet" })).await;
    let updated = load_or_create_user(&directory, &second).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.given_name.as_deref(), Some("Janet"));
}
