//! Auth collaborator: `Authenticate(token) -> userID`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::{AuthMode, AuthSection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Known display name; overrides the `userName` query parameter.
    pub display_name: Option<String>,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// Dev mode: every non-empty credential is its own user id.
#[derive(Debug, Default)]
pub struct OpenAuthenticator;

#[async_trait]
impl Authenticator for OpenAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<Identity> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Identity {
            user_id: token.to_string(),
            display_name: None,
        })
    }
}

/// Fixed token table, seeded from config.
#[derive(Default)]
pub struct AccountAuthenticator {
    accounts: DashMap<String, Identity>,
}

impl AccountAuthenticator {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.accounts.insert(token.into(), identity);
    }
}

#[async_trait]
impl Authenticator for AccountAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<Identity> {
        self.accounts.get(token).map(|r| r.value().clone())
    }
}

/// Build the authenticator selected by `auth.mode`.
pub fn from_config(cfg: &AuthSection) -> Arc<dyn Authenticator> {
    match cfg.mode {
        AuthMode::Open => Arc::new(OpenAuthenticator),
        AuthMode::Accounts => {
            let auth = AccountAuthenticator::new();
            for a in &cfg.accounts {
                auth.insert(
                    a.token.clone(),
                    Identity {
                        user_id: a.id.clone(),
                        display_name: a.display_name.clone(),
                    },
                );
            }
            Arc::new(auth)
        }
    }
}
