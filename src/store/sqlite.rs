use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::store::{StoreError, User, UserQuery, UserStore, UserUpdate};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    session_id    TEXT UNIQUE,
    reset_token   TEXT UNIQUE
);
"#;

/// sqlite-backed `UserStore`. Email uniqueness and token
/// uniqueness-at-assignment are enforced by the UNIQUE constraints above;
/// multi-field updates run in a transaction so readers never observe a
/// half-written record.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the
    /// schema exists.
    ///
    /// An in-memory database lives inside a single connection, so for
    /// `sqlite::memory:` the pool is pinned to one connection that never
    /// expires.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(%url, "user store opened");
        Ok(Self { pool })
    }

    /// Close the pool, flushing any outstanding work.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.into())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|dbe| matches!(dbe.kind(), sqlx::error::ErrorKind::UniqueViolation))
        .unwrap_or(false)
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn add_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES (?, ?)
            RETURNING id, email, password_hash, session_id, reset_token
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                unavailable(e)
            }
        })
    }

    async fn find_user_by(&self, query: UserQuery<'_>) -> Result<User, StoreError> {
        const SELECT_BY_ID: &str =
            "SELECT id, email, password_hash, session_id, reset_token FROM users WHERE id = ?";
        const SELECT_BY_EMAIL: &str =
            "SELECT id, email, password_hash, session_id, reset_token FROM users WHERE email = ?";
        const SELECT_BY_SESSION: &str =
            "SELECT id, email, password_hash, session_id, reset_token FROM users WHERE session_id = ?";
        const SELECT_BY_RESET: &str =
            "SELECT id, email, password_hash, session_id, reset_token FROM users WHERE reset_token = ?";

        let found = match query {
            UserQuery::Id(id) => {
                sqlx::query_as::<_, User>(SELECT_BY_ID)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            UserQuery::Email(email) => {
                sqlx::query_as::<_, User>(SELECT_BY_EMAIL)
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
            }
            UserQuery::SessionId(sid) => {
                sqlx::query_as::<_, User>(SELECT_BY_SESSION)
                    .bind(sid)
                    .fetch_optional(&self.pool)
                    .await
            }
            UserQuery::ResetToken(token) => {
                sqlx::query_as::<_, User>(SELECT_BY_RESET)
                    .bind(token)
                    .fetch_optional(&self.pool)
                    .await
            }
        };

        found.map_err(unavailable)?.ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let exists = sqlx::query("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unavailable)?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        if let Some(session_id) = update.session_id {
            sqlx::query("UPDATE users SET session_id = ? WHERE id = ?")
                .bind(session_id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;
        }
        if let Some(reset_token) = update.reset_token {
            sqlx::query("UPDATE users SET reset_token = ? WHERE id = ?")
                .bind(reset_token)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("open in-memory store")
    }

    #[tokio::test]
    async fn add_user_assigns_ids_and_rejects_duplicate_email() {
        let store = open().await;
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
        let store = open().await;
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

        let err = store.find_user_by(UserQuery::SessionId("nope")).await;
        assert!(matches!(err, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn update_user_clears_and_sets_fields_independently() {
        let store = open().await;
        let user = store.add_user("a@x.com", "hash").await.unwrap();

        store
            .update_user(user.id, UserUpdate::default().session_id(Some("sid".into())))
            .await
            .unwrap();
        store
            .update_user(user.id, UserUpdate::default().session_id(None))
            .await
            .unwrap();

        let found = store.find_user_by(UserQuery::Id(user.id)).await.unwrap();
        assert!(found.session_id.is_none());
    }

    #[tokio::test]
    async fn update_user_unknown_id_is_not_found() {
        let store = open().await;
        let err = store
            .update_user(42, UserUpdate::default().reset_token(None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn two_users_may_both_have_cleared_tokens() {
        // UNIQUE columns must still admit multiple NULLs.
        let store = open().await;
        store.add_user("a@x.com", "ha").await.unwrap();
        store.add_user("b@x.com", "hb").await.unwrap();
    }
}
