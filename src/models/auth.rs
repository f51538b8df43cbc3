use serde::{Deserialize, Serialize};

/// Claims embedded in both access and refresh tokens. The two kinds differ
/// only by signing secret and lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated access token by the bearer extractor.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}
