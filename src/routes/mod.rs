pub mod auth;
pub mod availability;
pub mod colors;
pub mod dates;
pub mod groups;
pub mod health;
pub mod users;

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{middleware::auth::JwtSecret, AppState};

/// Full application router, shared by the server binary and the API tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    let api = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/lookup", get(users::lookup_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/groups", get(users::get_user_groups))
        // Groups
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/creator/{creator_id}", get(groups::get_groups_by_creator))
        .route(
            "/groups/{id}/members",
            get(groups::list_members).post(groups::add_member),
        )
        .route(
            "/groups/{id}/members/{user_id}",
            put(groups::update_member).delete(groups::remove_member),
        )
        // Colors
        .route("/color", get(colors::list_colors).post(colors::create_color))
        .route("/color/hexcode", get(colors::get_color_by_hex))
        .route(
            "/color/{id}",
            get(colors::get_color)
                .put(colors::update_color)
                .delete(colors::delete_color),
        )
        // Availabilities
        .route(
            "/availability",
            get(availability::list_availabilities).post(availability::create_availability),
        )
        .route(
            "/availability/{id}",
            get(availability::get_availability)
                .put(availability::update_availability)
                .delete(availability::delete_availability),
        )
        .route(
            "/availability/user/{user_id}",
            get(availability::get_availability_by_user_id),
        )
        .route(
            "/availability/owner/{user_id}",
            get(availability::get_availabilities_by_owner),
        )
        // Dates
        .route("/date", get(dates::list_dates).post(dates::create_date))
        .route("/date/range", get(dates::get_dates_in_range))
        .route(
            "/date/{id}",
            get(dates::get_date)
                .put(dates::update_date)
                .delete(dates::delete_date),
        )
        .route("/date/user/{user_id}", get(dates::get_dates_by_user))
        .route(
            "/date/recurrence/{recurrence_id}",
            get(dates::get_date_by_recurrence),
        )
        .route(
            "/date/recurrence/{recurrence_id}/children",
            get(dates::get_recurrence_children),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
