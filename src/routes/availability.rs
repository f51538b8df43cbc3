use axum::{extract::State, http::StatusCode};

use crate::{
    error::{require_positive_id, AppError},
    extract::{Json, Path},
    models::{
        auth::AuthenticatedUser,
        availability::{Availability, AvailabilityRequest, UpdateAvailabilityRequest},
    },
    services::availability::AvailabilityService,
    AppState,
};

pub async fn list_availabilities(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Availability>>, AppError> {
    AvailabilityService::list(&state.store).await.map(Json)
}

pub async fn create_availability(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<AvailabilityRequest>,
) -> Result<(StatusCode, Json<Availability>), AppError> {
    AvailabilityService::create(&state.store, &body)
        .await
        .map(|a| (StatusCode::CREATED, Json(a)))
}

pub async fn get_availability(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Availability>, AppError> {
    let id = require_positive_id("id", id)?;
    AvailabilityService::get(&state.store, id).await.map(Json)
}

pub async fn get_availability_by_user_id(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Availability>, AppError> {
    let user_id = require_positive_id("user_id", user_id)?;
    AvailabilityService::get_by_user_id(&state.store, user_id)
        .await
        .map(Json)
}

pub async fn get_availabilities_by_owner(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Availability>>, AppError> {
    let user_id = require_positive_id("user_id", user_id)?;
    AvailabilityService::list_by_owner(&state.store, user_id)
        .await
        .map(Json)
}

pub async fn update_availability(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Availability>, AppError> {
    let id = require_positive_id("id", id)?;
    AvailabilityService::update(&state.store, id, &body)
        .await
        .map(Json)
}

pub async fn delete_availability(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    AvailabilityService::delete(&state.store, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
