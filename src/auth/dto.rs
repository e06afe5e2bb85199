use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for password-reset initiation.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

/// Confirmation returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub email: String,
    pub message: String,
}

/// Returned after a successful login; the caller decides where the
/// session id travels (cookie, header).
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub email: String,
    pub session_id: String,
}

/// Identity payload for the profile endpoint.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub email: String,
}

/// Generic confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Returned from password-reset initiation; delivery of the token to the
/// user is out of band.
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}
