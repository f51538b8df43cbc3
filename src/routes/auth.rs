use axum::extract::State;

use crate::{
    error::AppError,
    extract::Json,
    models::{
        auth::{RefreshTokenRequest, TokenResponse},
        user::{LoginRequest, RegisterRequest},
    },
    services::auth::AuthService,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    AuthService::register(&state.store, &state.config, &body)
        .await
        .map(Json)
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    AuthService::login(&state.store, &state.config, &body)
        .await
        .map(Json)
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    AuthService::refresh(&state.store, &state.config, &body.refresh_token)
        .await
        .map(Json)
}
