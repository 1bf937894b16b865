//! Server-side session storage owned by the identity provider client.
//!
//! The browser only ever holds the opaque session id; tokens stay here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Session, SessionUser, TokenSet};

#[derive(Debug, Clone)]
struct StoredSession {
    user: SessionUser,
    tokens: TokenSet,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Store a freshly signed-in user and return the new session id
    pub async fn create(&self, user: SessionUser, tokens: TokenSet) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut sessions = self.inner.write().await;
        sessions.retain(|_, stored| stored.expires_at > now);
        sessions.insert(
            id,
            StoredSession {
                user,
                tokens,
                expires_at: now + self.ttl,
            },
        );
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.inner.read().await;
            match sessions.get(id) {
                Some(stored) if stored.expires_at > now => {
                    return Some(Session {
                        user: stored.user.clone(),
                        id: Some(*id),
                        tokens: stored.tokens.clone(),
                    });
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.inner.write().await.remove(id);
        None
    }

    pub async fn update_tokens(&self, id: &Uuid, tokens: TokenSet) {
        if let Some(stored) = self.inner.write().await.get_mut(id) {
            stored.tokens = tokens;
        }
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.inner.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;

    #[tokio::test]
    async fn created_sessions_are_found() {
        let store = SessionStore::new(60);
        let id = store.create(SessionUser::new("auth0|1"), TokenSet::default()).await;

        let session = store.get(&id).await.expect("session");
        assert_eq!(session.user.sub, "auth0|1");
        assert_eq!(session.id, Some(id));
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = SessionStore::new(0);
        let id = store.create(SessionUser::new("auth0|1"), TokenSet::default()).await;

        assert!(store.get(&id).await.is_none());
        assert!(!store.remove(&id).await);
    }

    #[tokio::test]
    async fn token_updates_are_visible() {
        let store = SessionStore::new(60);
        let id = store.create(SessionUser::new("auth0|1"), TokenSet::default()).await;

        store
            .update_tokens(
                &id,
                TokenSet {
                    access_token: Some(AccessToken::new("rotated")),
                    ..TokenSet::default()
                },
            )
            .await;

        let session = store.get(&id).await.expect("session");
        assert_eq!(session.tokens.access_token.as_ref().map(AccessToken::secret), Some("rotated"));
        assert!(store.remove(&id).await);
    }
}
