use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{password, token};
use crate::store::{StoreError, User, UserQuery, UserStore, UserUpdate};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    EmailTaken,

    #[error("no user registered under that email")]
    UserNotFound,

    #[error("authentication store unavailable")]
    Store(#[source] StoreError),

    #[error("credential hashing failed")]
    Hash(#[source] anyhow::Error),
}

/// Orchestrates registration, login validation and the session and
/// reset-token lifecycles. Holds no state of its own; everything mutable
/// lives behind the injected store handle.
///
/// Lookup failures on the login and session paths collapse to
/// `false`/`None` so the unauthenticated surface never reveals whether an
/// account exists. Reset-token issuance is the one operation that fails
/// loudly, since its callers sit behind a gated flow and benefit from a
/// real error. Store outages always propagate as `AuthError::Store`.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Register a new account. The email must be unused; the password is
    /// hashed before it ever reaches the store.
    pub async fn register(&self, email: &str, password_plain: &str) -> Result<User, AuthError> {
        match self.store.find_user_by(UserQuery::Email(email)).await {
            Ok(_) => return Err(AuthError::EmailTaken),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AuthError::Store(e)),
        }

        let hash = password::hash_password(password_plain).map_err(AuthError::Hash)?;

        let user = match self.store.add_user(email, &hash).await {
            Ok(user) => user,
            // Insert raced with a concurrent registration for the same email.
            Err(StoreError::DuplicateEmail) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(AuthError::Store(e)),
        };

        debug!(user_id = user.id, "user record created");
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are both just
    /// `false`; only a store outage is an error.
    pub async fn valid_login(&self, email: &str, password_plain: &str) -> Result<bool, AuthError> {
        let user = match self.store.find_user_by(UserQuery::Email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(AuthError::Store(e)),
        };
        Ok(password::verify_password(password_plain, &user.password_hash))
    }

    /// Start a session for the given email, replacing any existing one.
    /// Returns `None` when no such user exists.
    pub async fn create_session(&self, email: &str) -> Result<Option<String>, AuthError> {
        let user = match self.store.find_user_by(UserQuery::Email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(AuthError::Store(e)),
        };

        let session_id = token::new_token();
        self.store
            .update_user(user.id, UserUpdate::default().session_id(Some(session_id.clone())))
            .await
            .map_err(AuthError::Store)?;

        debug!(user_id = user.id, "session created");
        Ok(Some(session_id))
    }

    /// Resolve a session token to its user. Empty, unknown and stale tokens
    /// are all `None`; the caller cannot tell them apart.
    pub async fn get_user_from_session(&self, session_id: &str) -> Result<Option<User>, AuthError> {
        if session_id.is_empty() {
            return Ok(None);
        }
        match self.store.find_user_by(UserQuery::SessionId(session_id)).await {
            Ok(user) => Ok(Some(user)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// End the user's session. Idempotent: a user with no session, or no
    /// such user at all, is a no-op rather than an error.
    pub async fn destroy_session(&self, user_id: i64) -> Result<(), AuthError> {
        match self
            .store
            .update_user(user_id, UserUpdate::default().session_id(None))
            .await
        {
            Ok(()) => {
                debug!(user_id, "session destroyed");
                Ok(())
            }
            Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// Issue a password-reset token, replacing any outstanding one. Unlike
    /// the session paths this fails loudly on an unknown email.
    pub async fn get_reset_token(&self, email: &str) -> Result<String, AuthError> {
        let user = match self.store.find_user_by(UserQuery::Email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                warn!("reset token requested for unknown email");
                return Err(AuthError::UserNotFound);
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        let reset_token = token::new_token();
        self.store
            .update_user(user.id, UserUpdate::default().reset_token(Some(reset_token.clone())))
            .await
            .map_err(AuthError::Store)?;

        info!(user_id = user.id, "reset token issued");
        Ok(reset_token)
    }
}
