use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{check_round, Error, Result};

/// Opaque token naming the block (color, number, ...) a bet was placed on.
///
/// Dashboard clients send either a string or an integer, so both are kept
/// verbatim.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockId {
    Number(i64),
    Text(String),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(value) => write!(f, "{value}"),
            BlockId::Text(value) => f.write_str(value),
        }
    }
}

/// A wager admitted against a round number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    #[serde(alias = "betNo")]
    pub round_number: u64,
    #[serde(alias = "betBlock")]
    pub block_identifier: BlockId,
    #[serde(alias = "betAmount")]
    pub amount: Decimal,
}

impl Bet {
    /// Reject malformed bets before anything is written.
    ///
    /// The round number is not checked against the live round.
    pub fn validate(&self) -> Result<()> {
        check_round(self.round_number)?;
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(Error::invalid(format!(
                "bet amount must not be negative (got {})",
                self.amount
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn bet(round: u64, amount: &str) -> Bet {
        Bet {
            round_number: round,
            block_identifier: BlockId::Text("red".to_string()),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(bet(3, "10").validate().is_ok());
        assert!(bet(3, "0").validate().is_ok());
        assert!(bet(3, "-0").validate().is_ok());
        assert!(matches!(bet(3, "-0.01").validate(), Err(Error::InvalidInput(_))));
        assert!(matches!(bet(0, "5").validate(), Err(Error::InvalidInput(_))));
        assert!(bet(crate::MAX_ROUND, "5").validate().is_ok());
        assert!(matches!(
            bet(crate::MAX_ROUND + 1, "5").validate(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_legacy_payload() {
        let bet: Bet =
            serde_json::from_str(r#"{"betNo":3,"betBlock":7,"betAmount":12.5}"#).unwrap();
        assert_eq!(bet.round_number, 3);
        assert_eq!(bet.block_identifier, BlockId::Number(7));
        assert_eq!(bet.amount, Decimal::from_str("12.5").unwrap());

        let bet: Bet = serde_json::from_str(
            r#"{"roundNumber":4,"blockIdentifier":"green","amount":10}"#,
        )
        .unwrap();
        assert_eq!(bet.block_identifier, BlockId::Text("green".to_string()));
        assert_eq!(bet.block_identifier.to_string(), "green");
    }
}
