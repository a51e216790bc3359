//! Models for device records backing issued tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{AccountId, DeviceId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a device record.
///
/// One row exists per (account, fingerprint) pair; a repeat login from the
/// same fingerprint renews this row instead of inserting a second one.
pub struct Device {
    /// Unique identifier for the device record.
    pub id: DeviceId,
    /// Account that owns the device.
    pub account_id: AccountId,
    /// Public identifier embedded in issued tokens. Distinct from both the
    /// record id and the fingerprint.
    pub identifier: String,
    /// Caller-supplied fingerprint (e.g. a User-Agent string). Used for
    /// de-duplication only, never for security decisions.
    pub fingerprint: String,
    /// Timestamp when the device was first seen.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last login or validated request from this device.
    pub last_used_at: DateTime<Utc>,
    /// Timestamp after which tokens bound to this device stop validating.
    pub expires_at: DateTime<Utc>,
}

impl Device {
    /// Constructs a fresh device record with a newly generated public
    /// identifier. `expires_at` must already lie in the future.
    pub fn new(account_id: AccountId, fingerprint: String, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: DeviceId::new(),
            account_id,
            identifier: Uuid::new_v4().to_string(),
            fingerprint,
            created_at: now,
            last_used_at: now,
            expires_at,
        }
    }

    /// Whether the validity window has closed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of a device returned by the API.
pub struct DeviceResponse {
    pub id: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}

impl DeviceResponse {
    /// Builds the response DTO, flagging the device the caller's own token
    /// is bound to.
    pub fn from_device(device: Device, current_identifier: &str) -> Self {
        let is_current = device.identifier == current_identifier;
        Self {
            id: device.id.to_string(),
            fingerprint: device.fingerprint,
            created_at: device.created_at,
            last_used_at: device.last_used_at,
            expires_at: device.expires_at,
            is_current,
        }
    }
}
