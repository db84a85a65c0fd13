use core::cell::RefCell;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::*;

/// Where a single tile reveal currently is.
///
/// `BombCheck` branches to `BombResolved` or `AwaitingChainReveal`; a chain
/// reveal continues through `AwaitingResolution` and one of the confirmed
/// states to `RefreshingBalance` and `Settled`. Any ledger step can end in
/// `Failed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementPhase {
    BombCheck,
    BombResolved,
    AwaitingChainReveal,
    AwaitingResolution,
    TreasureConfirmed,
    AwaitingPayout,
    PayoutConfirmed,
    EmptyConfirmed,
    RefreshingBalance,
    Settled,
    Failed,
}

impl SettlementPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::BombResolved | Self::Settled | Self::Failed)
    }

    /// Once past this point the reveal fee has been submitted and there is no
    /// way back.
    pub const fn fee_submitted(self) -> bool {
        use SettlementPhase::*;
        matches!(
            self,
            AwaitingResolution | TreasureConfirmed | AwaitingPayout | PayoutConfirmed | EmptyConfirmed | RefreshingBalance | Settled
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    BombHit,
    Treasure,
    Empty,
}

impl RevealOutcome {
    pub const fn cell_state(self) -> CellState {
        match self {
            Self::BombHit => CellState::Bomb,
            Self::Treasure => CellState::Treasure,
            Self::Empty => CellState::Empty,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealReport {
    pub outcome: RevealOutcome,
    /// Player balance after settling, `None` when no ledger call was made or
    /// the refresh failed.
    pub new_balance: Option<Amount>,
}

/// Finds `loc` in a revealed-location map.
///
/// Absence is indeterminate (the ledger may not have indexed the reveal yet)
/// unless the ledger is known to be immediately consistent, in which case it
/// means "no treasure".
pub fn resolve_from_map(
    map: &RevealedMap,
    loc: Location,
    assume_consistent_index: bool,
) -> core::result::Result<bool, ResolutionFailure> {
    match map.get(loc) {
        Some(is_treasure) => Ok(is_treasure),
        None if assume_consistent_index => {
            log::debug!("{} missing from revealed map, treating as empty", loc);
            Ok(false)
        }
        None => Err(ResolutionFailure::NotIndexed(loc)),
    }
}

/// Locations with a settlement in flight and the phase each one is in.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    phases: RefCell<HashMap<Location, SettlementPhase>>,
}

impl InFlight {
    pub(crate) fn begin(&self, loc: Location) -> Result<SettlementTicket<'_>> {
        let mut phases = self.phases.borrow_mut();
        if phases.contains_key(&loc) {
            return Err(HuntError::SettlementInFlight(loc));
        }
        phases.insert(loc, SettlementPhase::BombCheck);
        log::debug!("{}: settlement started", loc);
        Ok(SettlementTicket {
            registry: self,
            loc,
        })
    }

    pub(crate) fn phase(&self, loc: Location) -> Option<SettlementPhase> {
        self.phases.borrow().get(&loc).copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.phases.borrow().len()
    }
}

/// Exclusive claim on one location's settlement, released on drop.
#[derive(Debug)]
pub(crate) struct SettlementTicket<'a> {
    registry: &'a InFlight,
    loc: Location,
}

impl SettlementTicket<'_> {
    pub(crate) fn loc(&self) -> Location {
        self.loc
    }

    pub(crate) fn advance(&self, phase: SettlementPhase) {
        let previous = self.registry.phases.borrow_mut().insert(self.loc, phase);
        log::debug!("{}: {:?} -> {:?}", self.loc, previous, phase);
    }

    /// Moves to `Failed` and hands the error back for propagation.
    pub(crate) fn fail(&self, err: HuntError) -> HuntError {
        self.advance(SettlementPhase::Failed);
        log::error!("{}: settlement failed: {}", self.loc, err);
        if err.funds_may_be_spent() {
            log::warn!("{}: the reveal fee may already be spent", self.loc);
        }
        err
    }
}

impl Drop for SettlementTicket<'_> {
    fn drop(&mut self) {
        let phase = self.registry.phases.borrow_mut().remove(&self.loc);
        if let Some(phase) = phase.filter(|phase| !phase.is_terminal()) {
            log::warn!("{}: settlement abandoned in {:?}", self.loc, phase);
            if phase.fee_submitted() {
                log::warn!("{}: the reveal fee may already be spent", self.loc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_is_exclusive_until_dropped() {
        let in_flight = InFlight::default();
        let loc = Location::new(1, 1);

        let ticket = in_flight.begin(loc).unwrap();
        assert_eq!(in_flight.begin(loc).unwrap_err(), HuntError::SettlementInFlight(loc));
        assert!(in_flight.begin(Location::new(0, 1)).is_ok());

        ticket.advance(SettlementPhase::AwaitingResolution);
        assert_eq!(in_flight.phase(loc), Some(SettlementPhase::AwaitingResolution));

        drop(ticket);
        assert_eq!(in_flight.phase(loc), None);
        assert_eq!(in_flight.len(), 0);
    }

    #[test]
    fn missing_entry_is_indeterminate_by_default() {
        let map: RevealedMap = [(Location::new(0, 0), true)].into_iter().collect();

        assert_eq!(resolve_from_map(&map, Location::new(0, 0), false), Ok(true));
        assert_eq!(
            resolve_from_map(&map, Location::new(1, 0), false),
            Err(ResolutionFailure::NotIndexed(Location::new(1, 0)))
        );
        assert_eq!(resolve_from_map(&map, Location::new(1, 0), true), Ok(false));
    }

    #[test]
    fn fee_submitted_phases() {
        assert!(!SettlementPhase::AwaitingChainReveal.fee_submitted());
        assert!(SettlementPhase::AwaitingResolution.fee_submitted());
        assert!(SettlementPhase::BombResolved.is_terminal());
    }
}
