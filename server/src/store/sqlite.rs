use anyhow::Context;
use colorclock_types::{Account, Bet, BlockId, Result, SettlementResult};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{unavailable, Insert, Store};

/// SQLite-backed store.
///
/// Statements run on the caller's thread under a single connection lock; each
/// statement is its own transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("open round store db")?;
        init_schema_sqlite(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn init_schema_sqlite(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS global_data (
             key TEXT PRIMARY KEY,
             value INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS active_bets (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             round_number INTEGER NOT NULL,
             block_id TEXT NOT NULL,
             amount TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS active_bets_round ON active_bets(round_number);
         CREATE TABLE IF NOT EXISTS results (
             round_number INTEGER PRIMARY KEY,
             payload TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS accounts (
             username TEXT PRIMARY KEY,
             balance TEXT NOT NULL,
             history TEXT NOT NULL
         );",
    )
    .context("init round store schema")?;
    Ok(())
}

fn decode_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(unavailable)
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(unavailable)
}

fn encode_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(unavailable)
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<u64>> {
        self.conn()
            .query_row(
                "SELECT value FROM global_data WHERE key = ?",
                params![key],
                |row| row.get::<_, u64>(0),
            )
            .optional()
            .map_err(unavailable)
    }

    fn upsert(&self, key: &str, value: u64) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO global_data (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(unavailable)?;
        Ok(())
    }

    fn append_bet(&self, bet: &Bet) -> Result<()> {
        let block_id = encode_json(&bet.block_identifier)?;
        self.conn()
            .execute(
                "INSERT INTO active_bets (round_number, block_id, amount) VALUES (?, ?, ?)",
                params![bet.round_number, block_id, bet.amount.to_string()],
            )
            .map_err(unavailable)?;
        Ok(())
    }

    fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT block_id, amount FROM active_bets WHERE round_number = ? ORDER BY id ASC",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map(params![round], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(unavailable)?;

        let mut bets = Vec::new();
        for row in rows {
            let (block_id, amount) = row.map_err(unavailable)?;
            bets.push(Bet {
                round_number: round,
                block_identifier: decode_json::<BlockId>(&block_id)?,
                amount: decode_decimal(&amount)?,
            });
        }
        Ok(bets)
    }

    fn insert_result(&self, result: &SettlementResult) -> Result<Insert> {
        let payload = encode_json(&result.settlement_payload)?;
        // The primary key turns the existence check and the write into one statement.
        let changed = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO results (round_number, payload) VALUES (?, ?)",
                params![result.round_number, payload],
            )
            .map_err(unavailable)?;
        Ok(if changed == 0 {
            Insert::Duplicate
        } else {
            Insert::Inserted
        })
    }

    fn results(&self) -> Result<Vec<SettlementResult>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT round_number, payload FROM results ORDER BY round_number ASC")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, u64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(unavailable)?;

        let mut results = Vec::new();
        for row in rows {
            let (round_number, payload) = row.map_err(unavailable)?;
            results.push(SettlementResult::new(round_number, decode_json(&payload)?));
        }
        Ok(results)
    }

    fn account(&self, username: &str) -> Result<Option<Account>> {
        let row = self
            .conn()
            .query_row(
                "SELECT balance, history FROM accounts WHERE username = ?",
                params![username],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(unavailable)?;
        let Some((balance, history)) = row else {
            return Ok(None);
        };
        Ok(Some(Account {
            username: username.to_string(),
            balance: decode_decimal(&balance)?,
            player_history: decode_json(&history)?,
        }))
    }

    fn create_account(&self, account: &Account) -> Result<Insert> {
        let history = encode_json(&account.player_history)?;
        let changed = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO accounts (username, balance, history) VALUES (?, ?, ?)",
                params![account.username, account.balance.to_string(), history],
            )
            .map_err(unavailable)?;
        Ok(if changed == 0 {
            Insert::Duplicate
        } else {
            Insert::Inserted
        })
    }

    fn set_balance(&self, username: &str, balance: Decimal) -> Result<bool> {
        let changed = self
            .conn()
            .execute(
                "UPDATE accounts SET balance = ? WHERE username = ?",
                params![balance.to_string(), username],
            )
            .map_err(unavailable)?;
        Ok(changed > 0)
    }

    fn push_history(&self, username: &str, entry: &Value) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(unavailable)?;
        let history = tx
            .query_row(
                "SELECT history FROM accounts WHERE username = ?",
                params![username],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(unavailable)?;
        let Some(history) = history else {
            return Ok(false);
        };
        let mut entries: Vec<Value> = decode_json(&history)?;
        entries.push(entry.clone());
        tx.execute(
            "UPDATE accounts SET history = ? WHERE username = ?",
            params![encode_json(&entries)?, username],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;
        Ok(true)
    }

    fn replace_history(&self, username: &str, entries: &[Value]) -> Result<bool> {
        let changed = self
            .conn()
            .execute(
                "UPDATE accounts SET history = ? WHERE username = ?",
                params![encode_json(entries)?, username],
            )
            .map_err(unavailable)?;
        Ok(changed > 0)
    }
}
