use axum::{
    extract::{Extension, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::auth::CurrentDevice,
    models::account::{Account, AuthResponse, LoginRequest, RegisterRequest},
    state::AppState,
    store::AuthStore,
    validation::Validate,
};

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;
    let fingerprint = resolve_fingerprint(payload.device_fingerprint.as_deref(), &headers);

    let (account, token) = state
        .accounts
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            &fingerprint,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            account: account.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;
    let fingerprint = resolve_fingerprint(payload.device_fingerprint.as_deref(), &headers);

    // Uniform failure for unknown identity and wrong password alike.
    let (account, token) = state
        .accounts
        .login(&payload.identity, &payload.password, &fingerprint)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    Ok(Json(AuthResponse {
        token,
        account: account.into(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
    Extension(current): Extension<CurrentDevice>,
) -> Result<Json<Value>, AppError> {
    if let Some(device) = state.store.find_device_by_identifier(&current.0).await? {
        if device.account_id == account.id {
            state.store.delete_device(device.id).await?;
        }
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

/// Prefers an explicit fingerprint from the payload, falling back to the
/// User-Agent header the way browsers identify themselves.
pub fn resolve_fingerprint(explicit: Option<&str>, headers: &HeaderMap) -> String {
    explicit
        .map(str::trim)
        .filter(|fp| !fp.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|agent| agent.trim().to_string())
                .filter(|agent| !agent.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
