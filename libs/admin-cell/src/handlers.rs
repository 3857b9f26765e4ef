use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentFilter, AppointmentListQuery, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest, TreatmentInput,
};
use appointment_cell::services::AppointmentBookingService;
use doctor_cell::models::{
    CreateDepartmentRequest, CreateDoctorRequest, DoctorSearchFilters, ReplaceAvailabilityRequest,
    UpdateDepartmentRequest, UpdateDoctorRequest,
};
use doctor_cell::services::{AvailabilityService, DepartmentService, DoctorService};
use patient_cell::models::{PatientSearchQuery, PatientView, UpdatePatientRequest};
use patient_cell::services::PatientService;
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{AdminListQuery, SearchQuery};
use crate::services::{AccountDeletionService, AdminDashboardService, AdminRecordsService, AdminSearchService};

// ==============================================================================
// DASHBOARD & SEARCH
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_dashboard(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let today = state.today();

    let dashboard = state
        .db
        .transaction(move |tx| AdminDashboardService::new(tx).dashboard(today))
        .await?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let results = state
        .db
        .transaction(move |tx| AdminSearchService::new(tx).search(&query))
        .await?;

    Ok(Json(json!(results)))
}

#[axum::debug_handler]
pub async fn delete_account(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let summary = state
        .db
        .transaction(move |tx| AccountDeletionService::new(tx).delete_account(user_id))
        .await?;

    Ok(Json(json!({
        "message": "Account deleted",
        "deleted": summary
    })))
}

// ==============================================================================
// DEPARTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_departments(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let departments = state
        .db
        .transaction(move |tx| DepartmentService::new(tx).list_departments())
        .await?;

    Ok(Json(json!({
        "departments": departments,
        "total": departments.len()
    })))
}

#[axum::debug_handler]
pub async fn create_department(
    State(state): State<AppState>,
    Json(request): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let department = state
        .db
        .transaction(move |tx| DepartmentService::new(tx).create_department(request))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Department created",
            "department": department
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_department(
    State(state): State<AppState>,
    Path(department_id): Path<Uuid>,
    Json(request): Json<UpdateDepartmentRequest>,
) -> Result<Json<Value>, AppError> {
    let department = state
        .db
        .transaction(move |tx| DepartmentService::new(tx).update_department(department_id, request))
        .await?;

    Ok(Json(json!({
        "message": "Department updated",
        "department": department
    })))
}

#[axum::debug_handler]
pub async fn delete_department(
    State(state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state
        .db
        .transaction(move |tx| DepartmentService::new(tx).delete_department(department_id))
        .await?;

    Ok(Json(json!({ "message": "Department deleted" })))
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Value>, AppError> {
    let filters = DoctorSearchFilters {
        department_id: query.department_id,
        query: query.q,
        include_inactive: query.include_inactive,
    };

    let doctors = state
        .db
        .transaction(move |tx| DoctorService::new(tx).list_doctors(&filters))
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<AppState>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).create_doctor(request))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor created",
            "doctor": doctor
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).get_doctor(doctor_id))
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).update_doctor(doctor_id, request))
        .await?;

    Ok(Json(json!({
        "message": "Doctor updated",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let summary = state
        .db
        .transaction(move |tx| AccountDeletionService::new(tx).delete_doctor(doctor_id))
        .await?;

    Ok(Json(json!({
        "message": "Doctor deleted",
        "deleted": summary
    })))
}

#[axum::debug_handler]
pub async fn blacklist_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).set_doctor_active(doctor_id, false))
        .await?;

    Ok(Json(json!({
        "message": "Doctor blacklisted",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn activate_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| DoctorService::new(tx).set_doctor_active(doctor_id, true))
        .await?;

    Ok(Json(json!({
        "message": "Doctor reactivated",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability = state
        .db
        .transaction(move |tx| AvailabilityService::new(tx).get_availability(doctor_id))
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn replace_doctor_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<ReplaceAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = state
        .db
        .transaction(move |tx| {
            AvailabilityService::new(tx).replace_availability(&principal, doctor_id, request.availability)
        })
        .await?;

    Ok(Json(json!({
        "message": "Availability updated",
        "doctor_id": doctor.id,
        "availability": doctor.availability
    })))
}

// ==============================================================================
// PATIENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Value>, AppError> {
    let search = PatientSearchQuery {
        query: query.q,
        include_inactive: query.include_inactive,
    };

    let patients: Vec<PatientView> = state
        .db
        .transaction(move |tx| PatientService::new(tx).list_patients(&search))
        .await?
        .into_iter()
        .map(PatientView::from)
        .collect();

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();

    let record = state
        .db
        .transaction(move |tx| AdminRecordsService::new(tx).patient_record(patient_id, today))
        .await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = state
        .db
        .transaction(move |tx| PatientService::new(tx).update_patient(patient_id, request))
        .await?;

    Ok(Json(json!({
        "message": "Patient updated",
        "patient": PatientView::from(patient)
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let summary = state
        .db
        .transaction(move |tx| AccountDeletionService::new(tx).delete_patient(patient_id))
        .await?;

    Ok(Json(json!({
        "message": "Patient deleted",
        "deleted": summary
    })))
}

#[axum::debug_handler]
pub async fn blacklist_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state
        .db
        .transaction(move |tx| PatientService::new(tx).set_patient_active(patient_id, false))
        .await?;

    Ok(Json(json!({
        "message": "Patient blacklisted",
        "patient": PatientView::from(patient)
    })))
}

#[axum::debug_handler]
pub async fn activate_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state
        .db
        .transaction(move |tx| PatientService::new(tx).set_patient_active(patient_id, true))
        .await?;

    Ok(Json(json!({
        "message": "Patient reactivated",
        "patient": PatientView::from(patient)
    })))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = AppointmentFilter::from_query(query, state.today())?;
    let slot_minutes = state.config.default_slot_minutes;

    let appointments = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).list_appointments(&principal, filter)
        })
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).book_appointment(&principal, request, today)
        })
        .await?;

    info!("Admin booked appointment {}", appointment.appointment.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked",
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).get_appointment(&principal, appointment_id)
        })
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let today = state.today();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).reschedule_appointment(
                &principal,
                appointment_id,
                request,
                today,
            )
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment rescheduled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).cancel_appointment(&principal, appointment_id, request)
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
    Json(treatment): Json<TreatmentInput>,
) -> Result<Json<Value>, AppError> {
    let slot_minutes = state.config.default_slot_minutes;

    let appointment = state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).complete_appointment(&principal, appointment_id, treatment)
        })
        .await?;

    Ok(Json(json!({
        "message": "Appointment completed",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot_minutes = state.config.default_slot_minutes;

    state
        .db
        .transaction(move |tx| {
            AppointmentBookingService::new(tx, slot_minutes).delete_appointment(&principal, appointment_id)
        })
        .await?;

    Ok(Json(json!({ "message": "Appointment deleted" })))
}
