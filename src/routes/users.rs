use axum::{extract::State, http::StatusCode};

use crate::{
    error::{require_positive_id, AppError},
    extract::{Json, Path, Query},
    models::{
        auth::AuthenticatedUser,
        group::Membership,
        user::{LookupUserQuery, UpdateUserRequest, User},
    },
    services::users::UserService,
    AppState,
};

/// List all active users.
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<User>>, AppError> {
    UserService::list(&state.store).await.map(Json)
}

/// Find a user by `username` or `email` query parameter.
pub async fn lookup_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<LookupUserQuery>,
) -> Result<Json<User>, AppError> {
    UserService::lookup(&state.store, &query).await.map(Json)
}

pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let id = require_positive_id("id", id)?;
    UserService::get(&state.store, id).await.map(Json)
}

pub async fn update_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let id = require_positive_id("id", id)?;
    UserService::update(&state.store, id, &body, state.config.bcrypt_cost)
        .await
        .map(Json)
}

pub async fn get_user_groups(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Membership>>, AppError> {
    let id = require_positive_id("id", id)?;
    UserService::groups(&state.store, id).await.map(Json)
}

/// Soft-delete the user and drop everything they own.
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    UserService::delete(&state.store, id).await?;
    tracing::info!(user_id = id, by = %user.email, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
