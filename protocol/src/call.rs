use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Amount;

/// Entrypoints of the treasure hunt contract.
pub mod entrypoint {
    pub const SET_TREASURES: &str = "set_treasures";
    pub const REVEAL: &str = "reveal";
    pub const REVEALED_AT: &str = "revealed_at";
    pub const GET_REVEALED: &str = "get_revealed";
    pub const GET_REVEAL_FEE: &str = "get_reveal_fee";
    pub const GET_REWARD_AMOUNT: &str = "get_reward_amount";
    pub const RESET_GAME: &str = "reset_game";
    pub const TREASURY_PAYOUT: &str = "treasury_payout";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Value attached to the call, in aettos.
    pub amount: Option<Amount>,
    /// Dry-run the call without submitting a transaction.
    pub static_call: bool,
}

impl CallOptions {
    pub fn paying(amount: Amount) -> Self {
        Self {
            amount: Some(amount),
            static_call: false,
        }
    }

    pub fn static_call() -> Self {
        Self {
            amount: None,
            static_call: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub decoded: Value,
    /// Present when the call was submitted as a transaction.
    pub tx_hash: Option<String>,
}

impl CallResult {
    pub fn value(decoded: Value) -> Self {
        Self {
            decoded,
            tx_hash: None,
        }
    }

    pub fn transaction(tx_hash: impl Into<String>, decoded: Value) -> Self {
        Self {
            decoded,
            tx_hash: Some(tx_hash.into()),
        }
    }
}
