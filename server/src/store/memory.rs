use colorclock_types::{Account, Bet, Error, Result, SettlementResult};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Insert, Store};

#[derive(Default)]
struct Tables {
    globals: HashMap<String, u64>,
    bets: BTreeMap<u64, Vec<Bet>>,
    results: BTreeMap<u64, SettlementResult>,
    accounts: BTreeMap<String, Account>,
}

/// Process-local store. Nothing survives a restart.
///
/// Outages can be simulated with [`MemoryStore::set_unavailable`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable` until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("memory store offline".to_string()));
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.tables()?.globals.get(key).copied())
    }

    fn upsert(&self, key: &str, value: u64) -> Result<()> {
        self.tables()?.globals.insert(key.to_string(), value);
        Ok(())
    }

    fn append_bet(&self, bet: &Bet) -> Result<()> {
        self.tables()?
            .bets
            .entry(bet.round_number)
            .or_default()
            .push(bet.clone());
        Ok(())
    }

    fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        Ok(self.tables()?.bets.get(&round).cloned().unwrap_or_default())
    }

    fn insert_result(&self, result: &SettlementResult) -> Result<Insert> {
        match self.tables()?.results.entry(result.round_number) {
            Entry::Occupied(_) => Ok(Insert::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(result.clone());
                Ok(Insert::Inserted)
            }
        }
    }

    fn results(&self) -> Result<Vec<SettlementResult>> {
        Ok(self.tables()?.results.values().cloned().collect())
    }

    fn account(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.tables()?.accounts.get(username).cloned())
    }

    fn create_account(&self, account: &Account) -> Result<Insert> {
        match self.tables()?.accounts.entry(account.username.clone()) {
            Entry::Occupied(_) => Ok(Insert::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                Ok(Insert::Inserted)
            }
        }
    }

    fn set_balance(&self, username: &str, balance: Decimal) -> Result<bool> {
        let mut tables = self.tables()?;
        let Some(account) = tables.accounts.get_mut(username) else {
            return Ok(false);
        };
        account.balance = balance;
        Ok(true)
    }

    fn push_history(&self, username: &str, entry: &Value) -> Result<bool> {
        let mut tables = self.tables()?;
        let Some(account) = tables.accounts.get_mut(username) else {
            return Ok(false);
        };
        account.player_history.push(entry.clone());
        Ok(true)
    }

    fn replace_history(&self, username: &str, entries: &[Value]) -> Result<bool> {
        let mut tables = self.tables()?;
        let Some(account) = tables.accounts.get_mut(username) else {
            return Ok(false);
        };
        account.player_history = entries.to_vec();
        Ok(true)
    }
}
