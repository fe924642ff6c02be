use colorclock_types::{Bet, Result, MAX_ROUND};
use std::sync::Arc;
use tracing::debug;

use crate::store::Store;

/// Round-scoped record of admitted bets.
///
/// Admission does not look at the live round: late or backfilled bets for any
/// round number are accepted as long as they are well formed.
pub struct BetLedger {
    store: Arc<dyn Store>,
}

impl BetLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn admit(&self, bet: Bet) -> Result<Bet> {
        bet.validate()?;
        self.store.append_bet(&bet)?;
        debug!(
            round = bet.round_number,
            block = %bet.block_identifier,
            amount = %bet.amount,
            "bet admitted"
        );
        Ok(bet)
    }

    /// Bets for `round`; empty when none were admitted.
    pub fn list_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        if round > MAX_ROUND {
            return Ok(Vec::new());
        }
        self.store.bets_for_round(round)
    }
}
