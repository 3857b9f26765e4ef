use axum::{middleware, routing::get, Router};

use shared_utils::extractor::{auth_middleware, require_doctor};
use shared_utils::AppState;

use crate::handlers;

/// Doctor self-service routes, mounted under `/doctor`.
pub fn doctor_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/profile",
            get(handlers::get_own_profile).put(handlers::update_own_profile),
        )
        .route(
            "/availability",
            get(handlers::get_own_availability).put(handlers::replace_own_availability),
        )
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
