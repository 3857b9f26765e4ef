use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{ReplaceAvailabilityRequest, UpdateOwnProfileRequest};
use crate::services::{AvailabilityService, DoctorService};

// ==============================================================================
// DOCTOR SELF-SERVICE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).own_profile(&principal))
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateOwnProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).update_own_profile(&principal, request))
        .await?;

    Ok(Json(json!({
        "message": "Profile updated",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn get_own_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let (doctor, next_available_date) = state
        .db
        .transaction(move |tx| {
            let doctor = DoctorService::new(tx).own_profile(&principal)?;
            let next = AvailabilityService::new(tx).next_available_date(doctor.id, today, 14, slot_minutes)?;
            Ok::<_, crate::models::DoctorError>((doctor, next))
        })
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor.id,
        "availability": doctor.availability,
        "next_available_date": next_available_date
    })))
}

#[axum::debug_handler]
pub async fn replace_own_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ReplaceAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| {
            let own = DoctorService::new(tx).own_profile(&principal)?;
            AvailabilityService::new(tx).replace_availability(&principal, own.id, request.availability)
        })
        .await?;

    Ok(Json(json!({
        "message": "Availability updated",
        "doctor_id": doctor.id,
        "availability": doctor.availability
    })))
}
