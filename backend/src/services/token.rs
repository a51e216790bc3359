//! Token issuance and validation bound to device records.
//!
//! Issuing a token always creates or renews the device record first; a token
//! never exists without a durably recorded device, because validation checks
//! the device's validity window on every request.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::device::Device;
use crate::store::{AuthStore, StoreError};
use crate::types::AccountId;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id in string form.
    pub sub: String,
    /// Public device identifier the token is bound to.
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Unique per-token id, reserved for revocation/audit.
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// The device record could not be durably recorded; no token is issued.
    #[error("persistence failure during token issuance: {0}")]
    Persistence(#[from] StoreError),
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Outcome of validating a presented token. Validation never errors; an
/// unverifiable token and a failed lookup both come out as `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    Valid {
        account_id: AccountId,
        device_identifier: String,
    },
    Invalid,
}

impl TokenValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenValidation::Valid { .. })
    }
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn AuthStore>,
    secret: String,
    issuer: String,
    audience: String,
    validity: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn AuthStore>, config: &Config) -> Self {
        Self {
            store,
            secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            validity: config.device_validity(),
        }
    }

    /// Builds a fresh device record whose validity window starts now. Used
    /// by registration, which persists the device in its own transaction.
    pub fn new_device(&self, account_id: AccountId, fingerprint: &str) -> Device {
        Device::new(account_id, fingerprint.to_string(), Utc::now() + self.validity)
    }

    /// Creates or renews the device record for (account, fingerprint), then
    /// signs a token bound to it. Renewal preserves the device's public
    /// identifier, so repeat logins from one fingerprint keep one record.
    pub async fn issue(
        &self,
        account_id: AccountId,
        fingerprint: &str,
    ) -> Result<String, TokenError> {
        let device = self
            .store
            .upsert_device(self.new_device(account_id, fingerprint))
            .await?;
        self.sign(account_id, &device)
    }

    /// Signs a token for an already-recorded device. Token expiry equals the
    /// device's expires_at, keeping the two validity windows in lockstep.
    pub fn sign(&self, account_id: AccountId, device: &Device) -> Result<String, TokenError> {
        let claims = Claims {
            sub: account_id.to_string(),
            device_id: device.identifier.clone(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: Utc::now().timestamp(),
            exp: device.expires_at.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?;
        Ok(token)
    }

    /// Checks signature, issuer, audience and expiry, then confirms the
    /// referenced device is still within its validity window. On success the
    /// device's last_used_at is bumped best-effort: a failed bump is logged
    /// but does not fail the validation.
    pub async fn validate(&self, token: &str) -> TokenValidation {
        let Ok(claims) = self.decode(token) else {
            return TokenValidation::Invalid;
        };
        let Ok(account_id) = claims.sub.parse::<AccountId>() else {
            return TokenValidation::Invalid;
        };

        let now = Utc::now();
        let device = match self
            .store
            .find_valid_device(account_id, &claims.device_id, now)
            .await
        {
            Ok(Some(device)) => device,
            Ok(None) => return TokenValidation::Invalid,
            Err(err) => {
                tracing::warn!(error = %err, "device lookup failed during token validation");
                return TokenValidation::Invalid;
            }
        };

        if let Err(err) = self.store.touch_device(device.id, now).await {
            tracing::warn!(
                error = %err,
                device_id = %device.id,
                "failed to bump device last_used_at after validation"
            );
        }

        TokenValidation::Valid {
            account_id,
            device_identifier: claims.device_id,
        }
    }

    /// Extracts the account id from a token without touching the store.
    /// Signature, issuer, audience and expiry are still verified.
    pub fn extract_account_id(&self, token: &str) -> Option<AccountId> {
        self.decode(token).ok()?.sub.parse().ok()
    }

    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )?;
        Ok(data.claims)
    }
}
