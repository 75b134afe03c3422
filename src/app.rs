use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tracker", get(handlers::get_tracker))
        .route("/api/meals", get(handlers::list_meals).post(handlers::add_meal))
        .route("/api/meals/:id", delete(handlers::remove_meal))
        .route(
            "/api/workouts",
            get(handlers::list_workouts).post(handlers::add_workout),
        )
        .route("/api/workouts/:id", delete(handlers::remove_workout))
        .route("/api/limit", put(handlers::set_limit))
        .route("/api/reset", post(handlers::reset_day))
        .with_state(state)
}
