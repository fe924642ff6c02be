//! Durable state behind the round engine.
//!
//! Every backend error is reported as [`Error::StoreUnavailable`]; callers
//! decide whether to surface it or retry on their next natural operation.

use colorclock_types::{Account, Bet, Error, Result, SettlementResult};
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt::Display;

mod memory;
pub use memory::MemoryStore;
mod sqlite;
pub use sqlite::SqliteStore;

/// Key holding the persisted countdown.
pub const COUNTDOWN_KEY: &str = "countdownSecondsRemaining";
/// Key holding the persisted round number.
pub const ROUND_KEY: &str = "currentRoundNumber";

/// Outcome of a conditional insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insert {
    Inserted,
    /// A row with the same key already existed; nothing was written.
    Duplicate,
}

/// Persistent key-value map plus the round-scoped collections.
///
/// No atomicity is promised across calls. Account mutations return `false`
/// when the username is unknown.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<u64>>;

    /// Idempotent create-or-replace.
    fn upsert(&self, key: &str, value: u64) -> Result<()>;

    fn append_bet(&self, bet: &Bet) -> Result<()>;

    /// Bets for one round in insertion order.
    fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>>;

    /// Insert unless a result for the same round exists, atomically.
    fn insert_result(&self, result: &SettlementResult) -> Result<Insert>;

    /// All results ordered by round number.
    fn results(&self) -> Result<Vec<SettlementResult>>;

    fn account(&self, username: &str) -> Result<Option<Account>>;

    fn create_account(&self, account: &Account) -> Result<Insert>;

    fn set_balance(&self, username: &str, balance: Decimal) -> Result<bool>;

    fn push_history(&self, username: &str, entry: &Value) -> Result<bool>;

    fn replace_history(&self, username: &str, entries: &[Value]) -> Result<bool>;
}

pub(crate) fn unavailable(err: impl Display) -> Error {
    Error::StoreUnavailable(err.to_string())
}
