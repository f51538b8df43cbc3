use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    config::Config,
    db::{Store, StoreError},
    error::{AppError, AppResult},
    models::{
        auth::{Claims, TokenResponse},
        user::{LoginRequest, NewUser, RegisterRequest, User},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService;

impl AuthService {
    /// Create the account and log it in.
    pub async fn register(
        store: &Store,
        config: &Config,
        req: &RegisterRequest,
    ) -> AppResult<TokenResponse> {
        req.validate()?;
        let email = req.email.trim();
        let username = req.username.trim();

        match store.users.find_by_email(email).await {
            Ok(_) => return Err(AppError::Conflict("Email already exists".into())),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        match store.users.find_by_username(username).await {
            Ok(_) => return Err(AppError::Conflict("Username already exists".into())),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = bcrypt::hash(&req.password, config.bcrypt_cost)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;

        // A concurrent registration can still lose the race on the unique
        // index; the store reports that as Conflict.
        let user = store
            .users
            .create(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                name: None,
                surname: None,
                color_id: None,
            })
            .await?;

        tracing::info!(user_id = user.id, "user registered");
        Self::issue_tokens(&user.email, config)
    }

    /// Check credentials; email is tried before username.
    pub async fn login(
        store: &Store,
        config: &Config,
        req: &LoginRequest,
    ) -> AppResult<TokenResponse> {
        req.validate()?;

        let user = Self::find_login_user(store, req)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        let valid = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|_| AppError::unauthorized(INVALID_CREDENTIALS))?;
        if !valid {
            tracing::warn!(user_id = user.id, "login rejected: bad password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        Self::issue_tokens(&user.email, config)
    }

    async fn find_login_user(store: &Store, req: &LoginRequest) -> AppResult<Option<User>> {
        let candidates = [
            req.email.as_deref().map(|e| (true, e.trim())),
            req.username.as_deref().map(|u| (false, u.trim())),
        ];
        for (by_email, key) in candidates.into_iter().flatten() {
            if key.is_empty() {
                continue;
            }
            let found = if by_email {
                store.users.find_by_email(key).await
            } else {
                store.users.find_by_username(key).await
            };
            match found {
                Ok(user) => return Ok(Some(user)),
                Err(StoreError::NotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Exchange a valid refresh token for a new pair. The password is not
    /// checked again.
    pub async fn refresh(
        store: &Store,
        config: &Config,
        refresh_token: &str,
    ) -> AppResult<TokenResponse> {
        if refresh_token.is_empty() {
            return Err(AppError::validation("refresh_token must not be null"));
        }
        let claims = decode_claims(refresh_token, &config.jwt_refresh_secret)
            .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

        let user = match store.users.find_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::unauthorized("Refresh token subject no longer exists"))
            }
            Err(e) => return Err(e.into()),
        };

        Self::issue_tokens(&user.email, config)
    }

    pub fn issue_tokens(email: &str, config: &Config) -> AppResult<TokenResponse> {
        let access_token =
            generate_token(email, &config.jwt_secret, config.jwt_expiry_seconds)?;
        let refresh_token =
            generate_token(email, &config.jwt_refresh_secret, config.refresh_ttl_seconds())?;
        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer",
        })
    }
}

pub fn generate_token(email: &str, secret: &str, ttl_seconds: u64) -> AppResult<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: email.to_string(),
        iat: now,
        exp: now.saturating_add(ttl_seconds as usize),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token signing failed: {e}"))?;
    Ok(token)
}

/// Verify signature and expiry.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(data.claims)
}
