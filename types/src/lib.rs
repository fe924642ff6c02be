pub mod account;
pub use account::{Account, ManualOverride};
pub mod bet;
pub use bet::{Bet, BlockId};
pub mod error;
pub use error::{Error, Result};
pub mod round;
pub use round::{
    check_round, Phase, RoundState, Transition, DEFAULT_WINDOW_SECONDS, MAX_ROUND,
};
pub mod settlement;
pub use settlement::SettlementResult;
