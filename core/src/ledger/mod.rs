//! Boundary to the external ledger and treasury services.
//!
//! The core never signs, submits or indexes anything itself; it only calls
//! through these traits. Futures are not required to be `Send` so that
//! browser-backed implementations can hold JS handles.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use treasure_protocol::*;

pub use memory::*;
pub use treasury::*;

mod memory;
mod treasury;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Call to {entrypoint} rejected: {reason}")]
    Rejected { entrypoint: String, reason: String },
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },
    #[error("Ledger unreachable: {0}")]
    Network(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl LedgerError {
    pub fn rejected(entrypoint: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            entrypoint: entrypoint.to_string(),
            reason: reason.into(),
        }
    }
}

/// A contract instance on the ledger, as seen from one account.
#[async_trait(?Send)]
pub trait Ledger {
    async fn call_entrypoint(
        &self,
        name: &str,
        args: Vec<Value>,
        options: CallOptions,
    ) -> Result<CallResult, LedgerError>;

    async fn get_balance(&self, account: &AccountId) -> Result<Amount, LedgerError>;
}

/// Proof that a payout transaction was accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: Option<String>,
}

/// Pays rewards from a privileged account distinct from the player.
#[async_trait(?Send)]
pub trait Treasury {
    async fn payout(
        &self,
        contract: &ContractId,
        recipient: &AccountId,
        loc: Location,
        amount: Amount,
    ) -> Result<Receipt, LedgerError>;
}
