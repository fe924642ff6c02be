use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Player account kept by the account collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    pub balance: Decimal,
    #[serde(default)]
    pub player_history: Vec<Value>,
}

impl Account {
    pub fn new(username: String, balance: Decimal) -> Result<Self> {
        if username.trim().is_empty() {
            return Err(Error::invalid("username must not be empty"));
        }
        check_balance(balance)?;
        Ok(Self {
            username,
            balance,
            player_history: Vec::new(),
        })
    }
}

pub fn check_balance(balance: Decimal) -> Result<()> {
    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(Error::invalid(format!(
            "balance must not be negative (got {balance})"
        )));
    }
    Ok(())
}

/// Operator override read by the settlement collaborator.
///
/// The round engine stores the pair and never interprets it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverride {
    #[serde(default, alias = "isManualResultEnabled")]
    pub enabled: bool,
    #[serde(default, alias = "selectedColor")]
    pub chosen_value: Option<Value>,
}
