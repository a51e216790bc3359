//! Models that represent accounts and the authentication payloads around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::types::AccountId;
use crate::validation::rules;

#[derive(Debug, Clone, Serialize, FromRow)]
/// Database representation of a registered account.
pub struct Account {
    /// Unique identifier for the account.
    pub id: AccountId,
    /// Unique username used for login.
    pub username: String,
    /// Unique email address used for login.
    pub email: String,
    /// PBKDF2 hash of the account's password. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Constructs a new account with a freshly generated identifier.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: AccountId::new(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for creating a new account.
pub struct RegisterRequest {
    #[validate(custom(function = "rules::validate_username"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    /// Optional fingerprint override; falls back to the User-Agent header.
    #[serde(default)]
    pub device_fingerprint: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
/// Credentials submitted by a caller attempting to authenticate.
pub struct LoginRequest {
    /// Username or email address.
    #[validate(length(min = 1, message = "Identity is required"))]
    pub identity: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Optional fingerprint override; falls back to the User-Agent header.
    #[serde(default)]
    pub device_fingerprint: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
/// Payload for updating portions of an existing account.
pub struct UpdateAccountRequest {
    #[validate(custom(function = "rules::validate_username"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,
}

impl UpdateAccountRequest {
    /// Returns `true` when the payload carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of an account returned by the API.
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    /// Converts the persistent account model into the API response DTO.
    fn from(account: Account) -> Self {
        AccountResponse {
            id: account.id.to_string(),
            username: account.username,
            email: account.email,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Token and account returned after a successful registration or login.
pub struct AuthResponse {
    pub token: String,
    pub account: AccountResponse,
}
