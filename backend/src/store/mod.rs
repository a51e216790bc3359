//! Persistence abstraction for accounts and device records.
//!
//! The `AuthStore` trait is the narrow interface the token and account
//! services talk to. It is designed to be mockable using mockall for
//! testing; use `MockAuthStore` in tests to inject failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{account::Account, device::Device};
use crate::types::{AccountId, DeviceId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryAuthStore;
pub use postgres::PgAuthStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A username or email collided with an existing account. Deliberately
    /// carries no field detail.
    #[error("account already exists")]
    DuplicateAccount,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Persists changed account fields. Unique-constraint collisions map to
    /// `DuplicateAccount`.
    async fn update_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Deletes the account and, by cascade, every device it owns. Returns
    /// whether a row was removed.
    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError>;

    async fn find_device_by_id(&self, id: DeviceId) -> Result<Option<Device>, StoreError>;

    async fn find_device_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Device>, StoreError>;

    async fn list_devices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Device>, StoreError>;

    async fn find_device_by_fingerprint(
        &self,
        account_id: AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, StoreError>;

    /// The security-decision lookup: the device matching
    /// (account, identifier) whose expires_at is strictly after `now`.
    /// Always reads the freshest data; there is no cache in front of it.
    async fn find_valid_device(
        &self,
        account_id: AccountId,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Device>, StoreError>;

    /// Atomic create-or-renew keyed by (account, fingerprint). When a row
    /// already exists for the pair, only expires_at and last_used_at are
    /// taken from `device`; the stored id, identifier and created_at are
    /// preserved. Returns the row as persisted.
    async fn upsert_device(&self, device: Device) -> Result<Device, StoreError>;

    /// Best-effort last_used_at bump. Returns whether the row still existed.
    async fn touch_device(
        &self,
        id: DeviceId,
        last_used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn delete_device(&self, id: DeviceId) -> Result<bool, StoreError>;

    /// Housekeeping sweep: removes rows whose expires_at is at or before
    /// `now`. Returns the number of rows removed.
    async fn delete_expired_devices(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Registration unit of work: inserts the account and its first device
    /// in one transaction. Either both rows exist afterwards or neither
    /// does. Username/email collisions map to `DuplicateAccount`.
    async fn create_account_with_device(
        &self,
        account: &Account,
        device: Device,
    ) -> Result<Device, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_auth_store_satisfies_trait_bounds() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockAuthStore>();
    }

    #[test]
    fn duplicate_account_message_names_no_field() {
        let msg = StoreError::DuplicateAccount.to_string();
        assert_eq!(msg, "account already exists");
        assert!(!msg.contains("email"));
        assert!(!msg.contains("username"));
    }
}
