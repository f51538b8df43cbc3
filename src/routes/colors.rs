use axum::{extract::State, http::StatusCode};

use crate::{
    error::{require_positive_id, AppError},
    extract::{Json, Path, Query},
    models::{
        auth::AuthenticatedUser,
        color::{Color, CreateColorRequest, HexCodeQuery, UpdateColorRequest},
    },
    services::colors::ColorService,
    AppState,
};

pub async fn list_colors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Color>>, AppError> {
    ColorService::list(&state.store).await.map(Json)
}

pub async fn create_color(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateColorRequest>,
) -> Result<(StatusCode, Json<Color>), AppError> {
    ColorService::create(&state.store, &body)
        .await
        .map(|color| (StatusCode::CREATED, Json(color)))
}

pub async fn get_color(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Color>, AppError> {
    let id = require_positive_id("id", id)?;
    ColorService::get(&state.store, id).await.map(Json)
}

pub async fn get_color_by_hex(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<HexCodeQuery>,
) -> Result<Json<Color>, AppError> {
    ColorService::get_by_hex(&state.store, &query.hex_code)
        .await
        .map(Json)
}

pub async fn update_color(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateColorRequest>,
) -> Result<Json<Color>, AppError> {
    let id = require_positive_id("id", id)?;
    ColorService::update(&state.store, id, &body).await.map(Json)
}

pub async fn delete_color(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let id = require_positive_id("id", id)?;
    ColorService::delete(&state.store, id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
