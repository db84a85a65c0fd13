use thiserror::Error;
use treasure_protocol::{DecodeError, Location};

use crate::{LedgerError, SettlementPhase};

/// Why the outcome of a paid reveal could not be determined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("Ledger query failed: {0}")]
    Query(#[from] LedgerError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Location {0} is not in the revealed map yet")]
    NotIndexed(Location),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HuntError {
    #[error("Location {0} is out of bounds")]
    OutOfBounds(Location),
    #[error("Location {0} is already revealed")]
    AlreadyRevealed(Location),
    #[error("Location {0} already has a reveal in flight")]
    SettlementInFlight(Location),
    #[error("Round is not active, no new reveals are accepted")]
    RoundNotActive,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Reveal transaction for {location} failed: {source}")]
    RevealTx {
        location: Location,
        source: LedgerError,
    },
    #[error("Outcome of {location} unknown after the reveal was submitted, the fee may already be spent: {source}")]
    ResolutionQuery {
        location: Location,
        source: ResolutionFailure,
    },
    #[error("Treasure at {location} found but the reward payout failed: {source}")]
    Payout {
        location: Location,
        source: LedgerError,
    },
    #[error("Balance query failed: {0}")]
    BalanceQuery(#[source] LedgerError),
    #[error("Treasure placement failed: {0}")]
    Placement(#[source] LedgerError),
    #[error("Round reset failed: {0}")]
    Reset(#[source] LedgerError),
}

impl HuntError {
    /// Rejected before any ledger interaction.
    pub const fn is_local(&self) -> bool {
        use HuntError::*;
        matches!(
            self,
            OutOfBounds(_) | AlreadyRevealed(_) | SettlementInFlight(_) | RoundNotActive | InvalidConfig(_)
        )
    }

    /// The player's fee may have been taken even though the settlement failed.
    ///
    /// Retrying a reveal is only safe when this is false.
    pub const fn funds_may_be_spent(&self) -> bool {
        match self.failed_phase() {
            Some(phase) => phase.fee_submitted(),
            None => false,
        }
    }

    /// Settlement phase a failed reveal stopped in.
    pub const fn failed_phase(&self) -> Option<SettlementPhase> {
        match self {
            Self::RevealTx { .. } => Some(SettlementPhase::AwaitingChainReveal),
            Self::ResolutionQuery { .. } => Some(SettlementPhase::AwaitingResolution),
            Self::Payout { .. } => Some(SettlementPhase::AwaitingPayout),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, HuntError>;
