use colorclock_types::{Error, Result, SettlementResult};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{Insert, Store};

/// Append-only settlement record, at most one entry per round.
pub struct ResultRegistry {
    store: Arc<dyn Store>,
}

impl ResultRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn record(&self, result: SettlementResult) -> Result<SettlementResult> {
        result.validate()?;
        match self.store.insert_result(&result)? {
            Insert::Inserted => {
                info!(round = result.round_number, "result recorded");
                Ok(result)
            }
            Insert::Duplicate => {
                warn!(round = result.round_number, "duplicate result rejected");
                Err(Error::DuplicateRound(result.round_number))
            }
        }
    }

    pub fn list_all(&self) -> Result<Vec<SettlementResult>> {
        self.store.results()
    }
}
