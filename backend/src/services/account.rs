//! Registration and login orchestration.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::account::{Account, UpdateAccountRequest};
use crate::services::token::TokenService;
use crate::store::{AuthStore, StoreError};
use crate::types::AccountId;
use crate::utils::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AuthStore>,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(store: Arc<dyn AuthStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Creates an account and its first device in one transaction and
    /// returns the signed token. If the device cannot be persisted the
    /// account row is rolled back with it; a registered account always has
    /// a device able to authenticate it.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        fingerprint: &str,
    ) -> Result<(Account, String), AppError> {
        if self.store.find_account_by_email(email).await?.is_some() {
            return Err(StoreError::DuplicateAccount.into());
        }
        if self.store.find_account_by_username(username).await?.is_some() {
            return Err(StoreError::DuplicateAccount.into());
        }

        let password_hash = hash_password(password)?;
        let account = Account::new(username.to_string(), email.to_string(), password_hash);
        let device = self.tokens.new_device(account.id, fingerprint);
        let token = self.tokens.sign(account.id, &device)?;

        self.store
            .create_account_with_device(&account, device)
            .await?;

        tracing::info!(account_id = %account.id, "registered new account");
        Ok((account, token))
    }

    /// Resolves the identity by email first, then by username, and verifies
    /// the password. Unknown identity and wrong password both come out as
    /// `Ok(None)` so callers cannot enumerate accounts.
    pub async fn login(
        &self,
        identity: &str,
        password: &str,
        fingerprint: &str,
    ) -> Result<Option<(Account, String)>, AppError> {
        let account = match self.store.find_account_by_email(identity).await? {
            Some(account) => Some(account),
            None => self.store.find_account_by_username(identity).await?,
        };
        let Some(account) = account else {
            return Ok(None);
        };

        if !verify_password(password, &account.password_hash) {
            return Ok(None);
        }

        let token = self.tokens.issue(account.id, fingerprint).await?;
        Ok(Some((account, token)))
    }

    /// Applies a partial profile update. Uniqueness is re-checked for a
    /// changed username or email; the storage constraints back that check
    /// up against races.
    pub async fn update_profile(
        &self,
        id: AccountId,
        changes: &UpdateAccountRequest,
    ) -> Result<Account, AppError> {
        let mut account = self
            .store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        if let Some(username) = changes.username.as_deref() {
            if username != account.username {
                if self.store.find_account_by_username(username).await?.is_some() {
                    return Err(StoreError::DuplicateAccount.into());
                }
                account.username = username.to_string();
            }
        }

        if let Some(email) = changes.email.as_deref() {
            if email != account.email {
                if self.store.find_account_by_email(email).await?.is_some() {
                    return Err(StoreError::DuplicateAccount.into());
                }
                account.email = email.to_string();
            }
        }

        if let Some(password) = changes.password.as_deref() {
            account.password_hash = hash_password(password)?;
        }

        self.store.update_account(&account).await?;
        Ok(account)
    }

    /// Deletes the account; device records cascade with it.
    pub async fn delete(&self, id: AccountId) -> Result<(), AppError> {
        if !self.store.delete_account(id).await? {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        tracing::info!(account_id = %id, "deleted account");
        Ok(())
    }
}
