use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, ProfileResponse, RegisterRequest, RegisterResponse,
            ResetPasswordRequest, ResetTokenResponse, SessionResponse,
        },
        extractors::SessionToken,
        service::AuthError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/sessions", post(login).delete(logout))
        .route("/reset_password", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Store outages (and the never-in-practice hashing failure) are the only
/// 5xx-class conditions this service produces.
fn service_unavailable(e: AuthError) -> (StatusCode, String) {
    error!(error = %e, "auth backend failure");
    (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".into())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match state.auth.register(&payload.email, &payload.password).await {
        Ok(user) => user,
        Err(AuthError::EmailTaken) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email already registered".into()));
        }
        Err(e) => return Err(service_unavailable(e)),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: user.email,
            message: "user created".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let ok = state
        .auth
        .valid_login(&payload.email, &payload.password)
        .await
        .map_err(service_unavailable)?;

    if !ok {
        // Unknown email and wrong password answer identically.
        warn!("login rejected");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let session_id = state
        .auth
        .create_session(&payload.email)
        .await
        .map_err(service_unavailable)?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".into()))?;

    info!(email = %payload.email, "user logged in");
    Ok(Json(SessionResponse {
        email: payload.email,
        session_id,
    }))
}

#[instrument(skip(state, token))]
pub async fn profile(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let user = state
        .auth
        .get_user_from_session(&token)
        .await
        .map_err(service_unavailable)?
        .ok_or((StatusCode::FORBIDDEN, "Forbidden".to_string()))?;

    Ok(Json(ProfileResponse { email: user.email }))
}

#[instrument(skip(state, token))]
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user = state
        .auth
        .get_user_from_session(&token)
        .await
        .map_err(service_unavailable)?
        .ok_or((StatusCode::FORBIDDEN, "Forbidden".to_string()))?;

    state
        .auth
        .destroy_session(user.id)
        .await
        .map_err(service_unavailable)?;

    info!(user_id = user.id, "user logged out");
    Ok(Json(MessageResponse {
        message: "logged out".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetPasswordRequest>,
) -> Result<Json<ResetTokenResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let reset_token = match state.auth.get_reset_token(&payload.email).await {
        Ok(token) => token,
        Err(AuthError::UserNotFound) => {
            warn!("reset requested for unknown email");
            return Err((StatusCode::FORBIDDEN, "Forbidden".into()));
        }
        Err(e) => return Err(service_unavailable(e)),
    };

    Ok(Json(ResetTokenResponse {
        email: payload.email,
        reset_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn email_validation_rejects_garbage() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("spaces in@x.com"));
    }
}
