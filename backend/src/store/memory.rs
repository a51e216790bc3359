//! In-memory `AuthStore`.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{account::Account, device::Device};
use crate::types::{AccountId, DeviceId};

use super::{AuthStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    devices: HashMap<DeviceId, Device>,
}

#[derive(Debug, Default)]
pub struct InMemoryAuthStore {
    tables: RwLock<Tables>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl Tables {
    fn account_collides(&self, username: &str, email: &str, exclude: Option<AccountId>) -> bool {
        self.accounts.values().any(|a| {
            Some(a.id) != exclude && (a.username == username || a.email == email)
        })
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.account_collides(&account.username, &account.email, Some(account.id)) {
            return Err(StoreError::DuplicateAccount);
        }
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let removed = tables.accounts.remove(&id).is_some();
        if removed {
            tables.devices.retain(|_, d| d.account_id != id);
        }
        Ok(removed)
    }

    async fn find_device_by_id(&self, id: DeviceId) -> Result<Option<Device>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.devices.get(&id).cloned())
    }

    async fn find_device_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Device>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .devices
            .values()
            .find(|d| d.identifier == identifier)
            .cloned())
    }

    async fn list_devices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Device>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let mut devices: Vec<Device> = tables
            .devices
            .values()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(devices)
    }

    async fn find_device_by_fingerprint(
        &self,
        account_id: AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .devices
            .values()
            .find(|d| d.account_id == account_id && d.fingerprint == fingerprint)
            .cloned())
    }

    async fn find_valid_device(
        &self,
        account_id: AccountId,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Device>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .devices
            .values()
            .find(|d| {
                d.account_id == account_id && d.identifier == identifier && d.expires_at > now
            })
            .cloned())
    }

    async fn upsert_device(&self, device: Device) -> Result<Device, StoreError> {
        // The single write lock covers the lookup and the write, so two
        // concurrent logins from one fingerprint converge on one record.
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let existing_id = tables
            .devices
            .values()
            .find(|d| d.account_id == device.account_id && d.fingerprint == device.fingerprint)
            .map(|d| d.id);
        match existing_id {
            Some(id) => {
                let stored = tables.devices.get_mut(&id).ok_or_else(poisoned)?;
                stored.last_used_at = device.last_used_at;
                stored.expires_at = device.expires_at;
                Ok(stored.clone())
            }
            None => {
                tables.devices.insert(device.id, device.clone());
                Ok(device)
            }
        }
    }

    async fn touch_device(
        &self,
        id: DeviceId,
        last_used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        match tables.devices.get_mut(&id) {
            Some(device) => {
                device.last_used_at = last_used_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_device(&self, id: DeviceId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        Ok(tables.devices.remove(&id).is_some())
    }

    async fn delete_expired_devices(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let before = tables.devices.len();
        tables.devices.retain(|_, d| d.expires_at > now);
        Ok((before - tables.devices.len()) as u64)
    }

    async fn create_account_with_device(
        &self,
        account: &Account,
        device: Device,
    ) -> Result<Device, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.account_collides(&account.username, &account.email, None) {
            return Err(StoreError::DuplicateAccount);
        }
        tables.accounts.insert(account.id, account.clone());
        tables.devices.insert(device.id, device.clone());
        Ok(device)
    }
}
