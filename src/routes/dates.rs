use axum::{extract::State, http::StatusCode};

use crate::{
    error::{require_positive_id, AppError},
    extract::{Json, Path, Query},
    interval::RecurrenceLink,
    models::{
        auth::AuthenticatedUser,
        date::{Date, DateRequest, RangeQuery, UpdateDateRequest},
    },
    services::dates::DateService,
    AppState,
};

pub async fn list_dates(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Date>>, AppError> {
    DateService::list(&state.store).await.map(Json)
}

pub async fn create_date(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<DateRequest>,
) -> Result<(StatusCode, Json<Date>), AppError> {
    DateService::create(&state.store, &body)
        .await
        .map(|date| (StatusCode::CREATED, Json(date)))
}

pub async fn get_date(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Date>, AppError> {
    let id = require_positive_id("id", id)?;
    DateService::get(&state.store, id).await.map(Json)
}

pub async fn get_dates_by_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Date>>, AppError> {
    let user_id = require_positive_id("user_id", user_id)?;
    DateService::list_by_owner(&state.store, user_id)
        .await
        .map(Json)
}

/// `recurrence_id` is matched against the date's own id; the response
/// carries the parent it points to.
pub async fn get_date_by_recurrence(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(recurrence_id): Path<i64>,
) -> Result<Json<RecurrenceLink>, AppError> {
    let recurrence_id = require_positive_id("recurrence_id", recurrence_id)?;
    DateService::get_by_recurrence(&state.store, recurrence_id)
        .await
        .map(Json)
}

pub async fn get_recurrence_children(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(recurrence_id): Path<i64>,
) -> Result<Json<Vec<Date>>, AppError> {
    let recurrence_id = require_positive_id("recurrence_id", recurrence_id)?;
    DateService::recurrence_children(&state.store, recurrence_id)
        .await
        .map(Json)
}

pub async fn get_dates_in_range(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Date>>, AppError> {
    DateService::in_range(&state.store, &query).await.map(Json)
}

pub async fn update_date(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDateRequest>,
) -> Result<Json<Date>, AppError> {
    let id = require_positive_id("id", id)?;
    DateService::update(&state.store, id, &body).await.map(Json)
}

pub async fn delete_date(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    DateService::delete(&state.store, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
