use colorclock_types::{
    Account, Bet, Error, ManualOverride, Result, RoundState, SettlementResult,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;

mod accounts;
pub use accounts::AccountBook;
mod api;
pub use api::Api;
mod clock;
pub use clock::{RoundClock, Ticker};
mod config;
pub use config::ServerConfig;
mod ledger;
pub use ledger::BetLedger;
mod manual;
pub use manual::ManualOverrideCell;
mod metrics;
pub use metrics::ClockMetricsSnapshot;
mod registry;
pub use registry::ResultRegistry;
pub mod store;

/// Single entry point for the transport layer.
///
/// Combines the round clock, bet ledger and result registry over one store
/// so callers always see the same round state the ticker is advancing.
pub struct Coordinator {
    pub config: ServerConfig,
    clock: Arc<RoundClock>,
    ticker: Ticker,
    ledger: BetLedger,
    registry: ResultRegistry,
    manual: ManualOverrideCell,
    accounts: AccountBook,
}

impl Coordinator {
    /// Build a coordinator, restoring the round state persisted in `store`.
    ///
    /// The clock is not started.
    pub fn new(store: Arc<dyn store::Store>, config: ServerConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid)?;
        let clock = Arc::new(RoundClock::load(store.clone(), config.window_seconds)?);
        let ticker = Ticker::new(clock.clone(), config.tick_interval());
        Ok(Self {
            config,
            clock,
            ticker,
            ledger: BetLedger::new(store.clone()),
            registry: ResultRegistry::new(store.clone()),
            manual: ManualOverrideCell::default(),
            accounts: AccountBook::new(store),
        })
    }

    pub fn timer_state(&self) -> RoundState {
        self.clock.state()
    }

    pub fn current_round_number(&self) -> u64 {
        self.clock.state().current_round_number
    }

    /// Idempotent; returns `true` if this call started the clock.
    pub async fn start_clock(&self) -> bool {
        self.ticker.start().await
    }

    /// Stop ticking after the in-flight tick; returns `false` if idle.
    pub async fn stop_clock(&self) -> bool {
        self.ticker.stop().await
    }

    pub async fn clock_running(&self) -> bool {
        self.ticker.is_running().await
    }

    pub fn reset_round(&self) -> Result<RoundState> {
        self.clock.reset()
    }

    pub fn force_set_timer(&self, countdown: u32, round: u64) -> Result<RoundState> {
        self.clock.force_set(countdown, round)
    }

    pub fn set_round_number(&self, round: u64) -> Result<RoundState> {
        self.clock.set_round_number(round)
    }

    pub fn clock_metrics(&self) -> ClockMetricsSnapshot {
        self.clock.metrics()
    }

    pub fn submit_bet(&self, bet: Bet) -> Result<Bet> {
        self.ledger.admit(bet)
    }

    pub fn bets_for_round(&self, round: u64) -> Result<Vec<Bet>> {
        self.ledger.list_for_round(round)
    }

    pub fn submit_result(&self, result: SettlementResult) -> Result<SettlementResult> {
        self.registry.record(result)
    }

    pub fn result_history(&self) -> Result<Vec<SettlementResult>> {
        self.registry.list_all()
    }

    pub fn manual_override(&self) -> ManualOverride {
        self.manual.get()
    }

    pub fn set_manual_override(&self, value: ManualOverride) {
        self.manual.set(value)
    }

    pub fn register_account(&self, username: String, balance: Decimal) -> Result<Account> {
        self.accounts.register(username, balance)
    }

    pub fn balance(&self, username: &str) -> Result<Decimal> {
        self.accounts.balance(username)
    }

    pub fn set_balance(&self, username: &str, balance: Decimal) -> Result<()> {
        self.accounts.set_balance(username, balance)
    }

    pub fn player_history(&self, username: &str) -> Result<Vec<Value>> {
        self.accounts.history(username)
    }

    pub fn append_player_history(&self, username: &str, entry: Value) -> Result<()> {
        self.accounts.append_history(username, entry)
    }

    pub fn replace_player_history(&self, username: &str, entries: Vec<Value>) -> Result<()> {
        self.accounts.replace_history(username, entries)
    }
}
