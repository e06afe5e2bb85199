use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{StoreError, User, UserQuery, UserStore, UserUpdate};

/// In-memory `UserStore` for tests and ephemeral deployments. A single
/// `RwLock` over the whole table serializes writes, so every update is an
/// atomic read-modify-write and readers never see a half-written record.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<i64, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn add_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            session_id: None,
            reset_token: None,
        };
        inner.users.insert(user.id, user.clone());
        debug!(user_id = user.id, "user record added");
        Ok(user)
    }

    async fn find_user_by(&self, query: UserQuery<'_>) -> Result<User, StoreError> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .find(|u| match query {
                UserQuery::Id(id) => u.id == id,
                UserQuery::Email(email) => u.email == email,
                UserQuery::SessionId(sid) => u.session_id.as_deref() == Some(sid),
                UserQuery::ResetToken(token) => u.reset_token.as_deref() == Some(token),
            })
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;

        if let Some(session_id) = update.session_id {
            user.session_id = session_id;
        }
        if let Some(reset_token) = update.reset_token {
            user.reset_token = reset_token;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_user_assigns_ids_and_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let a = store.add_user("a@x.com", "hash-a").await.unwrap();
        let b = store.add_user("b@x.com", "hash-b").await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.session_id.is_none());
        assert!(a.reset_token.is_none());

        let err = store.add_user("a@x.com", "hash-c").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn find_user_by_each_supported_key() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", "hash").await.unwrap();
        store
            .update_user(
                user.id,
                UserUpdate::default()
                    .session_id(Some("sid-1".into()))
                    .reset_token(Some("rt-1".into())),
            )
            .await
            .unwrap();

        for query in [
            UserQuery::Id(user.id),
            UserQuery::Email("a@x.com"),
            UserQuery::SessionId("sid-1"),
            UserQuery::ResetToken("rt-1"),
        ] {
            let found = store.find_user_by(query).await.unwrap();
            assert_eq!(found.id, user.id);
        }

        let err = store.find_user_by(UserQuery::Email("nobody@x.com")).await;
        assert!(matches!(err, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn update_user_touches_only_requested_fields() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", "hash").await.unwrap();

        store
            .update_user(user.id, UserUpdate::default().session_id(Some("sid".into())))
            .await
            .unwrap();
        store
            .update_user(user.id, UserUpdate::default().reset_token(Some("rt".into())))
            .await
            .unwrap();

        let found = store.find_user_by(UserQuery::Id(user.id)).await.unwrap();
        assert_eq!(found.session_id.as_deref(), Some("sid"));
        assert_eq!(found.reset_token.as_deref(), Some("rt"));

        store
            .update_user(user.id, UserUpdate::default().session_id(None))
            .await
            .unwrap();
        let found = store.find_user_by(UserQuery::Id(user.id)).await.unwrap();
        assert!(found.session_id.is_none());
        assert_eq!(found.reset_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn update_user_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_user(42, UserUpdate::default().session_id(None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
