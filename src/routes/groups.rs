use axum::{extract::State, http::StatusCode};

use crate::{
    error::{require_positive_id, AppError},
    extract::{Json, Path},
    models::{
        auth::AuthenticatedUser,
        group::{
            AddMemberRequest, CreateGroupRequest, Group, Membership, UpdateGroupRequest,
            UpdateMemberRequest,
        },
    },
    services::groups::GroupService,
    AppState,
};

pub async fn list_groups(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Group>>, AppError> {
    GroupService::list(&state.store).await.map(Json)
}

pub async fn create_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    GroupService::create(&state.store, &body)
        .await
        .map(|group| (StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Group>, AppError> {
    let id = require_positive_id("id", id)?;
    GroupService::get(&state.store, id).await.map(Json)
}

pub async fn get_groups_by_creator(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(creator_id): Path<i64>,
) -> Result<Json<Vec<Group>>, AppError> {
    let creator_id = require_positive_id("creator_id", creator_id)?;
    GroupService::list_by_creator(&state.store, creator_id)
        .await
        .map(Json)
}

pub async fn update_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    let id = require_positive_id("id", id)?;
    GroupService::update(&state.store, id, &body).await.map(Json)
}

pub async fn delete_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    GroupService::delete(&state.store, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Membership>>, AppError> {
    let id = require_positive_id("id", id)?;
    GroupService::list_members(&state.store, id).await.map(Json)
}

pub async fn add_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<Membership>), AppError> {
    let id = require_positive_id("id", id)?;
    GroupService::add_member(&state.store, id, &body)
        .await
        .map(|m| (StatusCode::CREATED, Json(m)))
}

pub async fn update_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, user_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateMemberRequest>,
) -> Result<Json<Membership>, AppError> {
    let id = require_positive_id("id", id)?;
    let user_id = require_positive_id("user_id", user_id)?;
    GroupService::update_member(&state.store, id, user_id, &body)
        .await
        .map(Json)
}

pub async fn remove_member(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    let user_id = require_positive_id("user_id", user_id)?;
    GroupService::remove_member(&state.store, id, user_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
