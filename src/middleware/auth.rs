use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, models::auth::AuthenticatedUser, services::auth::decode_claims};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| anyhow::anyhow!("JWT secret not configured"))?;

        decode_access_token(token, &secret.0)
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

pub fn decode_access_token(token: &str, secret: &str) -> Result<AuthenticatedUser, AppError> {
    let claims = decode_claims(token, secret).map_err(|e| {
        tracing::debug!("bearer token rejected: {e}");
        AppError::unauthorized("Invalid or expired token")
    })?;
    Ok(AuthenticatedUser { email: claims.sub })
}
