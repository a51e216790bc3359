use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::account::{Account, AccountResponse, UpdateAccountRequest},
    state::AppState,
    validation::Validate,
};

pub async fn me(
    Extension(account): Extension<Account>,
) -> Result<Json<AccountResponse>, AppError> {
    Ok(Json(account.into()))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    payload.validate()?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let updated = state.accounts.update_profile(account.id, &payload).await?;
    Ok(Json(updated.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
) -> Result<Json<Value>, AppError> {
    state.accounts.delete(account.id).await?;
    Ok(Json(json!({ "message": "Account deleted" })))
}
