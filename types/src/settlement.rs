use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{check_round, Result};

const ROUND_FIELD: &str = "roundNumber";
const LEGACY_ROUND_FIELD: &str = "betNumber";
const PAYLOAD_FIELD: &str = "settlementPayload";

/// Settlement outcome recorded once for a closed round.
///
/// Accepts two shapes on input:
/// - `{roundNumber, settlementPayload}`
/// - a flat dashboard entry such as `{betNumber, color, number}`, where every
///   field other than the round number becomes the payload
///
/// Mixing the two is rejected so no field is ever dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Map<String, Value>")]
pub struct SettlementResult {
    pub round_number: u64,
    /// Opaque to the round engine; produced and read by the settlement side.
    pub settlement_payload: Value,
}

impl SettlementResult {
    pub fn new(round_number: u64, settlement_payload: Value) -> Self {
        Self {
            round_number,
            settlement_payload,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_round(self.round_number)
    }
}

impl TryFrom<Map<String, Value>> for SettlementResult {
    type Error = String;

    fn try_from(mut fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let round = match (fields.remove(ROUND_FIELD), fields.remove(LEGACY_ROUND_FIELD)) {
            (Some(round), None) | (None, Some(round)) => round,
            (Some(_), Some(_)) => {
                return Err(format!(
                    "only one of `{ROUND_FIELD}` and `{LEGACY_ROUND_FIELD}` may be set"
                ))
            }
            (None, None) => return Err(format!("missing field `{ROUND_FIELD}`")),
        };
        let round_number = round
            .as_u64()
            .ok_or_else(|| format!("invalid round number {round}"))?;

        let settlement_payload = match fields.remove(PAYLOAD_FIELD) {
            Some(payload) if fields.is_empty() => payload,
            Some(_) => {
                let extra = fields.keys().cloned().collect::<Vec<_>>().join(", ");
                return Err(format!(
                    "unexpected fields next to `{PAYLOAD_FIELD}`: {extra}"
                ));
            }
            None if fields.is_empty() => Value::Null,
            None => Value::Object(fields),
        };

        Ok(Self {
            round_number,
            settlement_payload,
        })
    }
}
