//! PostgreSQL-backed `AuthStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{account::Account, device::Device};
use crate::types::{AccountId, DeviceId};

use super::{AuthStore, StoreError};

#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_account_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateAccount,
        _ => StoreError::Database(err),
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, created_at";
const DEVICE_COLUMNS: &str =
    "id, account_id, identifier, fingerprint, created_at, last_used_at, expires_at";

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE username = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET username = $1, email = $2, password_hash = $3
            WHERE id = $4
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(map_account_error)?;
        Ok(())
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        // devices go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_device_by_id(&self, id: DeviceId) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {} FROM devices WHERE id = $1",
            DEVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    async fn find_device_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {} FROM devices WHERE identifier = $1",
            DEVICE_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    async fn list_devices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Device>, StoreError> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            "SELECT {} FROM devices WHERE account_id = $1 \
             ORDER BY last_used_at DESC, created_at DESC, id DESC",
            DEVICE_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(devices)
    }

    async fn find_device_by_fingerprint(
        &self,
        account_id: AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {} FROM devices WHERE account_id = $1 AND fingerprint = $2",
            DEVICE_COLUMNS
        ))
        .bind(account_id)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    async fn find_valid_device(
        &self,
        account_id: AccountId,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Device>, StoreError> {
        let device = sqlx::query_as::<_, Device>(&format!(
            "SELECT {} FROM devices \
             WHERE account_id = $1 AND identifier = $2 AND expires_at > $3",
            DEVICE_COLUMNS
        ))
        .bind(account_id)
        .bind(identifier)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(device)
    }

    async fn upsert_device(&self, device: Device) -> Result<Device, StoreError> {
        // The unique constraint on (account_id, fingerprint) makes two
        // concurrent logins from the same fingerprint converge on one row;
        // the loser of the race lands in the DO UPDATE arm as a renewal.
        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices
                (id, account_id, identifier, fingerprint, created_at, last_used_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (account_id, fingerprint) DO UPDATE
            SET last_used_at = EXCLUDED.last_used_at,
                expires_at = EXCLUDED.expires_at
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        ))
        .bind(device.id)
        .bind(device.account_id)
        .bind(&device.identifier)
        .bind(&device.fingerprint)
        .bind(device.created_at)
        .bind(device.last_used_at)
        .bind(device.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(device)
    }

    async fn touch_device(
        &self,
        id: DeviceId,
        last_used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE devices SET last_used_at = $1 WHERE id = $2")
            .bind(last_used_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_device(&self, id: DeviceId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_devices(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM devices WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_account_with_device(
        &self,
        account: &Account,
        device: Device,
    ) -> Result<Device, StoreError> {
        // Dropping the transaction without commit rolls it back, so a
        // cancelled request can never leave an account without its device.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_account_error)?;

        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices
                (id, account_id, identifier, fingerprint, created_at, last_used_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        ))
        .bind(device.id)
        .bind(device.account_id)
        .bind(&device.identifier)
        .bind(&device.fingerprint)
        .bind(device.created_at)
        .bind(device.last_used_at)
        .bind(device.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(device)
    }
}
