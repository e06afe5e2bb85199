use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Extracts the opaque session token from the `Authorization: Bearer`
/// header. Resolution of the token to a user happens in the handler, so a
/// missing header and an unknown token produce the same outward response.
pub struct SessionToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::FORBIDDEN, "Forbidden".to_string()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::FORBIDDEN, "Forbidden".to_string()))?;

        Ok(SessionToken(token.to_string()))
    }
}
