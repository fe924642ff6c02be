use colorclock_types::account::check_balance;
use colorclock_types::{Account, Error, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::store::{Insert, Store};

/// Thin adapter over account rows: balances and player history.
///
/// Balances are stored as given; no arithmetic happens here.
pub struct AccountBook {
    store: Arc<dyn Store>,
}

fn not_found(username: &str) -> Error {
    Error::NotFound(format!("user {username}"))
}

impl AccountBook {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn register(&self, username: String, balance: Decimal) -> Result<Account> {
        let account = Account::new(username, balance)?;
        match self.store.create_account(&account)? {
            Insert::Inserted => {
                info!(username = %account.username, "account registered");
                Ok(account)
            }
            Insert::Duplicate => Err(Error::invalid(format!(
                "user {} already exists",
                account.username
            ))),
        }
    }

    pub fn balance(&self, username: &str) -> Result<Decimal> {
        self.store
            .account(username)?
            .map(|account| account.balance)
            .ok_or_else(|| not_found(username))
    }

    pub fn set_balance(&self, username: &str, balance: Decimal) -> Result<()> {
        check_balance(balance)?;
        if !self.store.set_balance(username, balance)? {
            return Err(not_found(username));
        }
        Ok(())
    }

    pub fn history(&self, username: &str) -> Result<Vec<Value>> {
        self.store
            .account(username)?
            .map(|account| account.player_history)
            .ok_or_else(|| not_found(username))
    }

    pub fn append_history(&self, username: &str, entry: Value) -> Result<()> {
        if !self.store.push_history(username, &entry)? {
            return Err(not_found(username));
        }
        Ok(())
    }

    pub fn replace_history(&self, username: &str, entries: Vec<Value>) -> Result<()> {
        if !self.store.replace_history(username, &entries)? {
            return Err(not_found(username));
        }
        Ok(())
    }
}
