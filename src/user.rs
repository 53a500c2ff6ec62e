//! Find-or-register flow for first-party user records.
//!
//! Instead of subclassing a framework user-loading service, the lookup and
//! store operations sit behind [`UserDirectory`] and the flow itself is the
//! plain function [`load_or_create_user`]: a returning subject gets its
//! profile refreshed from the latest claims, an unknown subject is
//! registered with a default role.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::principal::Principal;

pub const DEFAULT_USER_ROLE: &str = "ROLE_USER";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    /// Token subject this record is keyed by.
    pub subject: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user directory backend failure: {0}")]
    Backend(String),
}

/// Storage seam for user records. Real persistence lives outside this crate;
/// an in-memory implementation ships for tests and small deployments.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, DirectoryError>;
    async fn upsert(&self, user: User) -> Result<User, DirectoryError>;
}

fn profile_claim(principal: &Principal, claim: &str) -> Option<String> {
    principal
        .claims()
        .get(claim)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Load the user for an authenticated principal, creating it on first sight.
///
/// Returning users get profile fields refreshed from the latest claims; new
/// users are registered with the principal's roles, or [`DEFAULT_USER_ROLE`]
/// when the token carried none.
pub async fn load_or_create_user(
    directory: &dyn UserDirectory,
    principal: &Principal,
) -> Result<User, DirectoryError> {
    match directory.find_by_subject(principal.subject()).await? {
        Some(mut user) => {
            if let Some(given) = profile_claim(principal, "given_name") {
                user.given_name = Some(given);
            }
            if let Some(family) = profile_claim(principal, "family_name") {
                user.family_name = Some(family);
            }
            user.updated_at = Utc::now();
            directory.upsert(user).await
        }
        None => {
            let mut roles = principal.roles().clone();
            if roles.is_empty() {
                roles.insert(DEFAULT_USER_ROLE.to_string());
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                subject: principal.subject().to_string(),
                email: profile_claim(principal, "email"),
                given_name: profile_claim(principal, "given_name"),
                family_name: profile_claim(principal, "family_name"),
                roles,
                created_at: now,
                updated_at: now,
            };
            info!(subject = %user.subject, "registering new user");
            directory.upsert(user).await
        }
    }
}

/// In-memory directory keyed by subject.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.get(subject).cloned())
    }

    async fn upsert(&self, user: User) -> Result<User, DirectoryError> {
        self.users
            .write()
            .await
            .insert(user.subject.clone(), user.clone());
        Ok(user)
    }
}
