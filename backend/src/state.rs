use std::sync::Arc;

use crate::{
    config::Config,
    services::{account::AccountService, token::TokenService},
    store::AuthStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthStore>,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn AuthStore>, config: Config) -> Self {
        let tokens = TokenService::new(store.clone(), &config);
        let accounts = AccountService::new(store.clone(), tokens.clone());
        Self {
            store,
            tokens,
            accounts,
            config,
        }
    }
}
