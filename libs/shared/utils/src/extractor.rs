use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::warn;
use uuid::Uuid;

use shared_database::accounts;
use shared_models::auth::{Principal, Role};
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

/// Pull the bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Err(AppError::Auth("Missing authorization header".to_string()));
    }

    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

/// Resolve a token subject to a live account. Deactivated or deleted
/// accounts lose access immediately, whatever their token says.
pub async fn load_active_principal(state: &AppState, id: Uuid) -> Result<Principal, AppError> {
    let account = state
        .db
        .transaction(move |tx| accounts::find_account(tx, id))
        .await?;

    match account {
        Some(account) if account.is_active => Ok(account.principal()),
        Some(account) => {
            warn!("Rejected token for deactivated account {}", account.id);
            Err(AppError::Auth("Account has been deactivated".to_string()))
        }
        None => Err(AppError::Auth("Account no longer exists".to_string())),
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let claimed = validate_token(&token, &state.config.secret_key).map_err(AppError::Auth)?;
    let principal = load_active_principal(&state, claimed.id).await?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub fn extract_principal<B>(request: &Request<B>) -> Result<Principal, AppError> {
    request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

pub fn require_role(principal: &Principal, role: Role) -> Result<(), AppError> {
    if principal.role != role {
        warn!("{} {} attempted a {} operation", principal.role, principal.id, role);
        return Err(AppError::Forbidden(format!("{} access required", role)));
    }
    Ok(())
}

async fn role_gate(role: Role, request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let principal = extract_principal(&request)?;
    require_role(&principal, role)?;
    Ok(next.run(request).await)
}

// Layer these inside `auth_middleware`.

pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    role_gate(Role::Admin, request, next).await
}

pub async fn require_doctor(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    role_gate(Role::Doctor, request, next).await
}

pub async fn require_patient(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    role_gate(Role::Patient, request, next).await
}
