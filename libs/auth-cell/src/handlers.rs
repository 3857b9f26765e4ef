use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{Principal, TokenResponse};
use shared_models::error::AppError;
use shared_utils::extractor::load_active_principal;
use shared_utils::jwt::{issue_token, validate_token as decode_token};
use shared_utils::AppState;

use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let account = state
        .db
        .transaction(move |tx| AuthService::new(tx).authenticate(&request.email, &request.password))
        .await?;

    let ttl_hours = state.config.token_ttl_hours;
    let token = issue_token(&account.principal(), &state.config.secret_key, ttl_hours).map_err(AppError::Internal)?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: ttl_hours * 3600,
        dashboard_path: account.role.dashboard_path(),
        user: account,
    }))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (user, patient) = state
        .db
        .transaction(move |tx| AuthService::new(tx).register(request))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please log in.",
            "user": user,
            "patient": patient
        })),
    ))
}

/// Token introspection. The account behind the token must still be active.
#[axum::debug_handler]
pub async fn validate_token(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;
    let claimed = decode_token(bearer.token(), &state.config.secret_key).map_err(AppError::Auth)?;
    let principal = load_active_principal(&state, claimed.id).await?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: principal.id,
        email: principal.email,
        role: principal.role,
    }))
}

#[axum::debug_handler]
pub async fn current_account(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let account = state
        .db
        .transaction(move |tx| AuthService::new(tx).current_account(&principal))
        .await?;

    Ok(Json(json!(account)))
}
