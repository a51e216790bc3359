use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::auth::CurrentDevice,
    models::{account::Account, device::DeviceResponse},
    state::AppState,
    store::AuthStore,
    types::DeviceId,
};

pub async fn list_devices(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
    Extension(current): Extension<CurrentDevice>,
) -> Result<Json<Vec<DeviceResponse>>, AppError> {
    let devices = state.store.list_devices_for_account(account.id).await?;
    let responses = devices
        .into_iter()
        .map(|device| DeviceResponse::from_device(device, &current.0))
        .collect();
    Ok(Json(responses))
}

pub async fn revoke_device(
    State(state): State<AppState>,
    Extension(account): Extension<Account>,
    Extension(current): Extension<CurrentDevice>,
    Path(device_id): Path<DeviceId>,
) -> Result<Json<Value>, AppError> {
    let device = state
        .store
        .find_device_by_id(device_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Device not found".to_string()))?;

    // Cross-account access answers 404 as well; no existence leak.
    if device.account_id != account.id {
        return Err(AppError::NotFound("Device not found".to_string()));
    }

    if device.identifier == current.0 {
        return Err(AppError::BadRequest(
            "Cannot revoke current device; use logout instead".to_string(),
        ));
    }

    state.store.delete_device(device.id).await?;

    Ok(Json(json!({
        "message": "Device revoked",
        "device_id": device_id.to_string()
    })))
}
